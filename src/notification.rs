//! Desktop notifications after a translation

use tracing::{debug, warn};

use crate::core::config::Settings;
use crate::core::models::TranslationResult;
use crate::orchestrator::Notifier;

const APP_NAME: &str = "Clipboard Translator";
const PREVIEW_CHARS: usize = 120;

#[cfg(windows)]
const COMPLETION_SOUND: &str = "Default";
#[cfg(not(windows))]
const COMPLETION_SOUND: &str = "message-new-instant";

/// Notification popups through `notify-rust`; failures are only logged
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopNotifier {
    show_popup: bool,
    play_sound: bool,
}

impl DesktopNotifier {
    pub fn new(show_popup: bool, play_sound: bool) -> Self {
        Self {
            show_popup,
            play_sound,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.show_notification_popup,
            settings.play_sound_on_translation,
        )
    }

    fn show(&self, summary: &str, body: &str, sound: bool) {
        let mut notification = notify_rust::Notification::new();
        notification.appname(APP_NAME).summary(summary).body(body);
        if sound {
            notification.sound_name(COMPLETION_SOUND);
        }

        if let Err(err) = notification.show() {
            warn!("system notification failed: {err}");
        }
    }
}

fn completion_body(result: &TranslationResult) -> String {
    let text = result.translated_text().unwrap_or_default();
    let mut body: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        body.push('…');
    }
    match result.detected_language() {
        Some(language) => format!("{}\n({})", body, language),
        None => body,
    }
}

impl Notifier for DesktopNotifier {
    fn translation_completed(&self, result: &TranslationResult) {
        if !self.show_popup {
            if self.play_sound {
                debug!("Completion sound needs notification popups enabled");
            }
            return;
        }
        self.show("Translation completed", &completion_body(result), self.play_sound);
    }

    fn error(&self, message: &str) {
        if self.show_popup {
            self.show("Translation error", message, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_body() {
        let result = TranslationResult::success("Olá", Some("English".to_string()));
        assert_eq!(completion_body(&result), "Olá\n(English)");

        let long = TranslationResult::success("a".repeat(200), None);
        let body = completion_body(&long);
        assert_eq!(body.chars().count(), PREVIEW_CHARS + 1);
        assert!(body.ends_with('…'));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.play_sound_on_translation = true;
        let notifier = DesktopNotifier::from_settings(&settings);
        assert!(notifier.show_popup);
        assert!(notifier.play_sound);
    }
}
