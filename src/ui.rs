use crate::theme::ThemeParams;

pub fn render_index(theme: &ThemeParams) -> String {
    INDEX_HTML
        .replace("{{BG}}", &theme.bg_color)
        .replace("{{TEXT}}", &theme.text_color)
        .replace("{{HINT}}", &theme.hint_color)
        .replace("{{LINK}}", &theme.link_color)
        .replace("{{BUTTON}}", &theme.button_color)
        .replace("{{BUTTON_TEXT}}", &theme.button_text_color)
        .replace("{{SECONDARY_BG}}", &theme.secondary_bg_color)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Water Tracker</title>
  <script src="https://telegram.org/js/telegram-web-app.js"></script>
  <style>
    :root {
      --bg: {{BG}};
      --ink: {{TEXT}};
      --hint: {{HINT}};
      --link: {{LINK}};
      --accent: {{BUTTON}};
      --accent-ink: {{BUTTON_TEXT}};
      --card: {{SECONDARY_BG}};
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: -apple-system, "Segoe UI", Roboto, sans-serif;
      padding: 20px 16px 40px;
    }

    .app {
      width: min(560px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 20px;
    }

    [hidden] {
      display: none !important;
    }

    h1 {
      margin: 0;
      font-size: 1.6rem;
    }

    .subtitle {
      margin: 4px 0 0;
      color: var(--hint);
    }

    .card {
      background: var(--card);
      border-radius: 18px;
      padding: 18px;
      display: grid;
      gap: 12px;
    }

    .progress {
      height: 14px;
      border-radius: 999px;
      background: rgba(127, 127, 127, 0.2);
      overflow: hidden;
    }

    .progress > div {
      height: 100%;
      width: 0;
      background: var(--accent);
      transition: width 300ms ease;
    }

    .totals {
      display: flex;
      justify-content: space-between;
      align-items: baseline;
    }

    .totals .value {
      font-size: 2rem;
      font-weight: 600;
    }

    .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: var(--hint);
    }

    .actions {
      display: grid;
      grid-template-columns: repeat(3, 1fr);
      gap: 10px;
    }

    button {
      border: none;
      border-radius: 12px;
      padding: 12px 14px;
      font-size: 1rem;
      font-weight: 600;
      background: var(--accent);
      color: var(--accent-ink);
      cursor: pointer;
    }

    button:disabled {
      opacity: 0.6;
    }

    form.inline {
      display: flex;
      gap: 10px;
    }

    input {
      flex: 1;
      min-width: 0;
      border-radius: 12px;
      border: 1px solid rgba(127, 127, 127, 0.3);
      padding: 12px;
      font-size: 1rem;
      background: var(--bg);
      color: var(--ink);
    }

    ul.entries {
      list-style: none;
      margin: 0;
      padding: 0;
      display: grid;
      gap: 8px;
    }

    ul.entries li {
      display: flex;
      justify-content: space-between;
    }

    ul.entries .time {
      color: var(--hint);
    }

    .status {
      min-height: 1.2em;
      font-size: 0.95rem;
      color: var(--hint);
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .avatar {
      width: 40px;
      height: 40px;
      border-radius: 50%;
      object-fit: cover;
    }

    header {
      display: flex;
      gap: 12px;
      align-items: center;
    }
  </style>
</head>
<body>
  <main class="app">
    <section id="loading-view">
      <p class="subtitle">Loading your water log...</p>
    </section>

    <section id="error-view" class="card" hidden>
      <h1 id="error-title">Something went wrong</h1>
      <p id="error-message" class="subtitle"></p>
      <button id="retry-btn" type="button">Try again</button>
    </section>

    <section id="ready-view" hidden>
      <div class="app">
        <header>
          <img id="avatar" class="avatar" alt="" hidden />
          <div>
            <h1 id="greeting">Hello</h1>
            <p class="subtitle" id="date"></p>
          </div>
        </header>

        <div class="card">
          <div class="totals">
            <div>
              <span class="label">Today</span>
              <div class="value"><span id="total">0</span> ml</div>
            </div>
            <div>
              <span class="label">Goal</span>
              <div><span id="goal">2000</span> ml (<span id="percentage">0</span>%)</div>
            </div>
          </div>
          <div class="progress"><div id="progress-bar"></div></div>
        </div>

        <div class="card">
          <span class="label">Add water</span>
          <div class="actions">
            <button type="button" data-amount="150">150 ml</button>
            <button type="button" data-amount="250">250 ml</button>
            <button type="button" data-amount="500">500 ml</button>
          </div>
          <form id="custom-form" class="inline">
            <input id="custom-amount" inputmode="numeric" placeholder="Custom amount (ml)" />
            <button type="submit">Add</button>
          </form>
        </div>

        <div class="card">
          <span class="label">Daily goal</span>
          <form id="goal-form" class="inline">
            <input id="goal-input" inputmode="numeric" placeholder="e.g. 2000" />
            <button type="submit">Save</button>
          </form>
        </div>

        <div class="card">
          <span class="label">Today's log</span>
          <ul id="entries" class="entries"></ul>
          <p id="empty" class="subtitle">Nothing logged yet today.</p>
        </div>
      </div>
    </section>

    <div class="status" id="status"></div>
  </main>

  <script>
    const views = {
      loading: document.getElementById('loading-view'),
      error: document.getElementById('error-view'),
      ready: document.getElementById('ready-view'),
    };
    const statusEl = document.getElementById('status');
    let session = null;
    let busy = false;

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const localDate = () => {
      const now = new Date();
      const pad = (n) => String(n).padStart(2, '0');
      return `${now.getFullYear()}-${pad(now.getMonth() + 1)}-${pad(now.getDate())}`;
    };

    const parseJson = (raw) => {
      try {
        return raw ? JSON.parse(raw) : undefined;
      } catch (_) {
        return undefined;
      }
    };

    const readLaunchParams = () => {
      const hash = new URLSearchParams(window.location.hash.slice(1));
      const search = new URLSearchParams(window.location.search);
      const get = (key) => hash.get(key) ?? search.get(key) ?? undefined;
      const params = {
        tgWebAppPlatform: get('tgWebAppPlatform'),
        tgWebAppStartParam: get('tgWebAppStartParam'),
        tgWebAppThemeParams: parseJson(get('tgWebAppThemeParams')),
      };
      const data = get('tgWebAppData');
      if (data) {
        const fields = new URLSearchParams(data);
        params.tgWebAppData = {
          user: parseJson(fields.get('user')),
          start_param: fields.get('start_param') ?? undefined,
        };
      }
      return params;
    };

    const readHost = () => {
      const app = window.Telegram && window.Telegram.WebApp;
      if (!app) {
        return undefined;
      }
      if (typeof app.ready === 'function') {
        app.ready();
      }
      return {
        initDataUnsafe: app.initDataUnsafe,
        themeParams: app.themeParams,
        platform: app.platform,
      };
    };

    const applyTheme = (theme) => {
      const root = document.documentElement.style;
      root.setProperty('--bg', theme.bg_color);
      root.setProperty('--ink', theme.text_color);
      root.setProperty('--hint', theme.hint_color);
      root.setProperty('--link', theme.link_color);
      root.setProperty('--accent', theme.button_color);
      root.setProperty('--accent-ink', theme.button_text_color);
      root.setProperty('--card', theme.secondary_bg_color);
    };

    const show = (name) => {
      Object.entries(views).forEach(([key, el]) => {
        el.hidden = key !== name;
      });
    };

    const renderDashboard = (dashboard) => {
      const profile = dashboard.profile;
      document.getElementById('greeting').textContent = `Hello, ${profile.first_name || 'friend'}`;
      document.getElementById('date').textContent = dashboard.date;
      document.getElementById('total').textContent = dashboard.total;
      document.getElementById('goal').textContent = dashboard.goal;
      document.getElementById('percentage').textContent = dashboard.percentage;
      document.getElementById('progress-bar').style.width = `${dashboard.percentage}%`;

      const avatar = document.getElementById('avatar');
      avatar.hidden = !profile.photo_url;
      if (profile.photo_url) {
        avatar.src = profile.photo_url;
      }

      const list = document.getElementById('entries');
      list.replaceChildren(...dashboard.entries.map((entry) => {
        const item = document.createElement('li');
        const amount = document.createElement('span');
        amount.textContent = `${entry.amount} ml`;
        const time = document.createElement('span');
        time.className = 'time';
        time.textContent = new Date(entry.timestamp).toLocaleTimeString([], { hour: '2-digit', minute: '2-digit' });
        item.append(amount, time);
        return item;
      }));
      document.getElementById('empty').hidden = dashboard.entries.length > 0;
    };

    const render = (view) => {
      session = view.session;
      applyTheme(view.theme);
      if (view.state === 'ready') {
        renderDashboard(view.dashboard);
        show('ready');
      } else if (view.state === 'error') {
        const identity = view.error.kind === 'identity';
        document.getElementById('error-title').textContent = identity
          ? 'Open this app from the chat'
          : 'Could not load your data';
        document.getElementById('error-message').textContent = view.error.message;
        document.getElementById('retry-btn').hidden = !view.error.retriable;
        show('error');
      } else {
        show('loading');
      }
    };

    const post = async (path, body) => {
      const res = await fetch(path, {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify(body),
      });
      if (!res.ok) {
        const msg = await res.text();
        throw new Error(msg || 'Request failed');
      }
      return res.json();
    };

    const bootstrap = async () => {
      show('loading');
      render(await post('/api/bootstrap', {
        launch_params: readLaunchParams(),
        host: readHost(),
        date: localDate(),
      }));
    };

    const requestId = () => (window.crypto && crypto.randomUUID)
      ? crypto.randomUUID()
      : `${Date.now()}-${Math.random().toString(16).slice(2)}`;

    const addWater = async (amount) => {
      if (busy) {
        return;
      }
      busy = true;
      setStatus('Saving...', 'info');
      try {
        render(await post('/api/intake', {
          session,
          amount,
          request_id: requestId(),
          date: localDate(),
        }));
        setStatus('', '');
      } finally {
        busy = false;
      }
    };

    document.querySelectorAll('[data-amount]').forEach((button) => {
      button.addEventListener('click', () => {
        addWater(Number(button.dataset.amount)).catch((err) => setStatus(err.message, 'error'));
      });
    });

    document.getElementById('custom-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const input = document.getElementById('custom-amount');
      addWater(input.value.trim())
        .then(() => { input.value = ''; })
        .catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('goal-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const input = document.getElementById('goal-input');
      post('/api/goal', { session, goal: input.value.trim() })
        .then((view) => {
          render(view);
          input.value = '';
        })
        .catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('retry-btn').addEventListener('click', () => {
      show('loading');
      post('/api/retry', { session, date: localDate() })
        .then(render)
        .catch((err) => setStatus(err.message, 'error'));
    });

    bootstrap().catch((err) => setStatus(err.message, 'error'));
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_placeholders_are_filled() {
        let html = render_index(&ThemeParams::default());
        assert!(!html.contains("{{"));
        assert!(html.contains("--accent: #50a8eb;"));
    }
}
