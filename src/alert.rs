//! Alert messages for reporting the outcome of HTMX requests.
//!
//! Alerts are swapped into the `#alert-container` element of the base page.

use maud::{Markup, html};

const ERROR_ALERT_STYLE: &str = "text-red-800 bg-red-50 border-red-300 \
    dark:bg-gray-800 dark:text-red-400 dark:border-red-800";

/// An error message with optional details.
#[derive(Debug, Clone)]
pub struct Alert<'a> {
    pub message: &'a str,
    pub details: &'a str,
}

impl<'a> Alert<'a> {
    /// Create a new error alert
    pub fn error(message: &'a str, details: &'a str) -> Self {
        Self { message, details }
    }

    /// Render the alert as an out-of-band swap into the alert container.
    pub fn into_html(self) -> Markup {
        html! {
            div id="alert-container" hx-swap-oob="true" class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div role="alert" class={ "p-4 mb-4 text-sm border rounded-lg " (ERROR_ALERT_STYLE) }
                {
                    div class="flex items-center justify-between"
                    {
                        span class="font-medium" { (self.message) }

                        button
                            type="button"
                            aria-label="Close"
                            onclick="this.closest('#alert-container').classList.add('hidden')"
                        {
                            "×"
                        }
                    }

                    @if !self.details.is_empty() {
                        p class="mt-1" { (self.details) }
                    }
                }
            }
        }
    }
}
