//! HTML status page rendering via `minijinja`.
//!
//! The page template is compiled into the binary so the status server has
//! no runtime file dependencies. Auto-escaping is on (the template name
//! ends in `.html`), so player names cannot inject markup.

use std::time::Duration;

use minijinja::{Environment, context};
use status_types::GameStateSnapshot;

/// Error raised while compiling or rendering the status page.
pub use minijinja::Error as TemplateError;

const STATUS_TEMPLATE_NAME: &str = "status.html";
const STATUS_TEMPLATE: &str = include_str!("../templates/status.html");

/// Renders the `GET /` status page.
pub struct StatusPage {
    env: Environment<'static>,
}

impl StatusPage {
    /// Compile the embedded status page template.
    ///
    /// # Errors
    ///
    /// Returns a template error if the embedded template does not parse.
    pub fn new() -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.add_template(STATUS_TEMPLATE_NAME, STATUS_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Render the page for a snapshot and the configured script list.
    ///
    /// # Errors
    ///
    /// Returns a template error if rendering fails.
    pub fn render(
        &self,
        snapshot: &GameStateSnapshot,
        scripts: &[String],
    ) -> Result<String, TemplateError> {
        self.env.get_template(STATUS_TEMPLATE_NAME)?.render(context! {
            server => snapshot,
            scripts => scripts,
            uptime => format_uptime(snapshot.server_uptime),
        })
    }
}

/// Format an uptime in seconds as `1d 02h 03m 04s`, dropping leading
/// zero units.
pub fn format_uptime(seconds: f64) -> String {
    let total = Duration::try_from_secs_f64(seconds)
        .unwrap_or_default()
        .as_secs();
    let days = total / 86_400;
    let hours = total % 86_400 / 3_600;
    let minutes = total % 3_600 / 60;
    let secs = total % 60;

    if days > 0 {
        format!("{days}d {hours:02}h {minutes:02}m {secs:02}s")
    } else if hours > 0 {
        format!("{hours}h {minutes:02}m {secs:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}
