use crate::models::{FREQUENCY_CHOICES, GENRE_CHOICES, RenderedView};
use crate::render::{escape_html, frequency_label};

pub fn render_index(view: &RenderedView) -> Result<String, serde_json::Error> {
    // `</` inside the JSON would close the script element early.
    let view_json = serde_json::to_string(view)?.replace("</", "<\\/");
    let updated = escape_html(view.updated_at.as_deref().unwrap_or("not yet"));

    Ok(fill_template(INDEX_HTML, |key| match key {
        "FREQUENCY_OPTIONS" => Some(frequency_options()),
        "GENRE_OPTIONS" => Some(genre_options()),
        "LISTEN_REASONS" => Some(view.listen_reasons.concat()),
        "RECOMMENDATIONS" => Some(view.recommendations.concat()),
        "TOTAL" => Some(view.total_responses.to_string()),
        "UPDATED" => Some(updated.clone()),
        "VIEW_JSON" => Some(view_json.clone()),
        _ => None,
    }))
}

/// Replaces `{{KEY}}` markers in one left-to-right pass. Substituted text is
/// never scanned again, so user text that looks like a marker stays literal.
/// Unknown keys are kept as they are.
fn fill_template(template: &str, value: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match value(key) {
                    Some(text) => out.push_str(&text),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn frequency_options() -> String {
    FREQUENCY_CHOICES
        .iter()
        .map(|choice| {
            format!(
                r#"<label class="choice"><input type="radio" name="frequency" value="{}" /> {}</label>"#,
                escape_html(choice),
                escape_html(&frequency_label(choice))
            )
        })
        .collect()
}

fn genre_options() -> String {
    GENRE_CHOICES
        .iter()
        .map(|choice| {
            let choice = escape_html(choice);
            format!(
                r#"<label class="choice"><input type="checkbox" name="genre" value="{choice}" /> {choice}</label>"#
            )
        })
        .collect()
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Music Survey</title>
  <script src="https://cdn.jsdelivr.net/npm/chart.js@4"></script>
  <style>
    :root {
      --bg: #eef4ff;
      --ink: #1f2937;
      --muted: #6b7280;
      --accent: #3b82f6;
      --card: rgba(255, 255, 255, 0.92);
      --shadow: 0 20px 50px rgba(59, 130, 246, 0.15);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(160deg, var(--bg), #f8fafc 70%);
      color: var(--ink);
      font-family: "Segoe UI", "Helvetica Neue", sans-serif;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(960px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 24px;
    }

    .card {
      background: var(--card);
      border-radius: 20px;
      box-shadow: var(--shadow);
      padding: 28px;
    }

    h1 {
      margin: 0 0 6px;
      font-size: clamp(1.8rem, 4vw, 2.4rem);
    }

    h2 {
      margin: 0 0 16px;
      font-size: 1.2rem;
    }

    .subtitle {
      margin: 0;
      color: var(--muted);
    }

    fieldset {
      border: none;
      margin: 0 0 18px;
      padding: 0;
    }

    legend {
      font-weight: 600;
      margin-bottom: 8px;
    }

    .choice {
      display: inline-flex;
      gap: 6px;
      align-items: center;
      margin: 0 14px 8px 0;
    }

    input[type="text"], textarea {
      width: 100%;
      padding: 10px 12px;
      border-radius: 10px;
      border: 1px solid #d1d5db;
      font: inherit;
      margin-bottom: 8px;
    }

    button {
      border: none;
      border-radius: 12px;
      padding: 14px 22px;
      font-size: 1rem;
      font-weight: 600;
      color: white;
      background: var(--accent);
      cursor: pointer;
    }

    button:disabled {
      opacity: 0.6;
      cursor: progress;
    }

    .form-error {
      color: #dc2626;
      min-height: 1.2em;
      margin: 8px 0 0;
    }

    .charts {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(280px, 1fr));
      gap: 24px;
    }

    .meta {
      color: var(--muted);
      font-size: 0.9rem;
      margin-top: 12px;
    }

    .record-item, .record-item-small {
      background: white;
      border: 1px solid #e5e7eb;
      border-radius: 12px;
      padding: 12px 14px;
      margin-bottom: 10px;
    }

    .record-item p {
      margin: 0;
    }

    .record-item em {
      display: block;
      color: var(--muted);
      margin-top: 4px;
    }

    .record-divider {
      margin: 10px 0;
      border: none;
      border-top: 1px solid #eee;
    }

    .loading-message {
      color: var(--muted);
    }

    .loading-message.error {
      color: red;
    }
  </style>
</head>
<body>
  <main class="app">
    <header class="card">
      <h1>What do you listen to?</h1>
      <p class="subtitle">Answer a few questions and see how everyone else answered.</p>
    </header>

    <section class="card">
      <form id="music-form">
        <fieldset>
          <legend>How often do you listen to music?</legend>
          {{FREQUENCY_OPTIONS}}
        </fieldset>
        <fieldset>
          <legend>Which genres do you like?</legend>
          {{GENRE_OPTIONS}}
          <input type="text" name="genre_other" placeholder="Other genre" />
        </fieldset>
        <fieldset>
          <legend>Why do you listen to music?</legend>
          <textarea name="listen_reason" rows="2"></textarea>
        </fieldset>
        <fieldset>
          <legend>Recommend something</legend>
          <input type="text" name="rec_artist" placeholder="Artist" />
          <input type="text" name="rec_artist_reason" placeholder="Why this artist?" />
          <input type="text" name="rec_song" placeholder="Song" />
          <input type="text" name="rec_song_reason" placeholder="Why this song?" />
        </fieldset>
        <button id="submit-btn" type="submit">Submit answers</button>
        <p class="form-error" id="form-error" role="alert"></p>
      </form>
    </section>

    <section class="card">
      <h2>Results</h2>
      <div class="charts">
        <div><canvas id="frequency-chart"></canvas></div>
        <div><canvas id="genre-chart"></canvas></div>
      </div>
      <p class="meta"><span id="total">{{TOTAL}}</span> responses, updated <span id="updated">{{UPDATED}}</span></p>
    </section>

    <section class="card">
      <h2>Why people listen</h2>
      <div id="listen-reasons-container">{{LISTEN_REASONS}}</div>
    </section>

    <section class="card">
      <h2>Recommendations</h2>
      <div id="records-container">{{RECOMMENDATIONS}}</div>
    </section>
  </main>

  <script>
    const initialView = {{VIEW_JSON}};
    const form = document.getElementById('music-form');
    const submitBtn = document.getElementById('submit-btn');
    const formError = document.getElementById('form-error');
    const charts = {};

    const chartConfig = (spec) => {
      const dataset = {
        label: spec.title,
        data: spec.values,
        backgroundColor: spec.colors,
        borderColor: 'rgba(255, 255, 255, 0.7)',
        borderWidth: 2
      };
      if (spec.kind === 'pie') {
        return {
          type: 'pie',
          data: { labels: spec.labels, datasets: [dataset] },
          options: {
            responsive: true,
            plugins: {
              legend: { position: 'bottom' },
              tooltip: { callbacks: { label: (ctx) => ' ' + spec.tooltips[ctx.dataIndex] } }
            }
          }
        };
      }
      return {
        type: 'bar',
        data: { labels: spec.labels, datasets: [dataset] },
        options: {
          responsive: true,
          indexAxis: 'y',
          scales: { x: { beginAtZero: true, ticks: { stepSize: 1 } } },
          plugins: { legend: { display: false } }
        }
      };
    };

    const drawChart = (id, spec) => {
      if (charts[id]) {
        charts[id].destroy();
      }
      charts[id] = new Chart(document.getElementById(id).getContext('2d'), chartConfig(spec));
    };

    const renderView = (view) => {
      drawChart('frequency-chart', view.frequency_chart);
      drawChart('genre-chart', view.genre_chart);
      document.getElementById('listen-reasons-container').innerHTML = view.listen_reasons.join('');
      document.getElementById('records-container').innerHTML = view.recommendations.join('');
      document.getElementById('total').textContent = String(view.total_responses);
      document.getElementById('updated').textContent = view.updated_at || 'not yet';
    };

    const readForm = () => {
      const data = new FormData(form);
      const text = (name) => (data.get(name) || '').trim();
      return {
        frequency: text('frequency'),
        genres: data.getAll('genre'),
        genre_other: text('genre_other'),
        listen_reason: text('listen_reason'),
        rec_artist: text('rec_artist'),
        rec_artist_reason: text('rec_artist_reason'),
        rec_song: text('rec_song'),
        rec_song_reason: text('rec_song_reason')
      };
    };

    form.addEventListener('submit', async (event) => {
      event.preventDefault();
      formError.textContent = '';

      const payload = readForm();
      if (!payload.frequency) {
        formError.textContent = 'Please choose how often you listen to music.';
        return;
      }
      if (payload.genres.length === 0 && !payload.genre_other) {
        formError.textContent = 'Please pick at least one genre.';
        return;
      }

      submitBtn.disabled = true;
      submitBtn.textContent = 'Submitting…';
      try {
        const res = await fetch('/api/submit', {
          method: 'POST',
          headers: { 'content-type': 'application/json' },
          body: JSON.stringify(payload)
        });
        if (!res.ok) {
          const msg = await res.text();
          throw new Error(msg || 'Request failed');
        }
        const result = await res.json();
        renderView(result.view);
        form.reset();
        alert(result.message);
      } catch (err) {
        console.error('submission failed', err);
        alert('Your answers could not be submitted. Please try again.\n' + err.message);
      } finally {
        submitBtn.disabled = false;
        submitBtn.textContent = 'Submit answers';
      }
    });

    renderView(initialView);
  </script>
</body>
</html>
"#;
