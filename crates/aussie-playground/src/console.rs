use aussie_proto::OutputEvent;

/// What the playground terminal shows before a run has produced anything.
pub const DEFAULT_BANNER: &str = "G'DAY MATE! HIT 'run' TO GET GOING";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    /// This event took the placeholder's spot.
    ReplacedPlaceholder,
    Appended,
}

/// The host-owned display buffer.
///
/// Shows a placeholder banner until the first output event of a run
/// arrives; starting a run resets it to the placeholder. The placeholder is
/// replaced exactly once per run, never eagerly cleared a second time.
pub struct Transcript {
    placeholder: &'static str,
    lines: Vec<OutputEvent>,
    showing_placeholder: bool,
}

impl Transcript {
    pub fn new(placeholder: &'static str) -> Self {
        Self {
            placeholder,
            lines: Vec::new(),
            showing_placeholder: true,
        }
    }

    /// Reset to the placeholder, as the playground does when a run starts
    /// or the terminal is cleared.
    pub fn begin_run(&mut self) {
        self.lines.clear();
        self.showing_placeholder = true;
    }

    pub fn append(&mut self, event: OutputEvent) -> Appended {
        let appended = if self.showing_placeholder {
            self.showing_placeholder = false;
            Appended::ReplacedPlaceholder
        } else {
            Appended::Appended
        };
        self.lines.push(event);
        appended
    }

    pub fn is_placeholder_visible(&self) -> bool {
        self.showing_placeholder
    }

    pub fn lines(&self) -> &[OutputEvent] {
        &self.lines
    }

    pub fn rendered(&self) -> String {
        if self.showing_placeholder {
            return self.placeholder.to_owned();
        }
        self.lines
            .iter()
            .map(OutputEvent::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_replaced_exactly_once() {
        let mut transcript = Transcript::new(DEFAULT_BANNER);
        assert_eq!(transcript.rendered(), DEFAULT_BANNER);

        transcript.begin_run();
        assert!(transcript.is_placeholder_visible());

        assert_eq!(
            transcript.append(OutputEvent::stdout("55")),
            Appended::ReplacedPlaceholder
        );
        assert_eq!(
            transcript.append(OutputEvent::stderr("strewth")),
            Appended::Appended
        );
        assert_eq!(transcript.rendered(), "55\nstrewth");
    }

    #[test]
    fn a_new_run_resets_to_the_placeholder() {
        let mut transcript = Transcript::new(DEFAULT_BANNER);
        transcript.begin_run();
        transcript.append(OutputEvent::stdout("first run"));

        transcript.begin_run();
        assert_eq!(transcript.rendered(), DEFAULT_BANNER);
        assert!(transcript.lines().is_empty());
        assert_eq!(
            transcript.append(OutputEvent::stdout("second run")),
            Appended::ReplacedPlaceholder
        );
    }

    #[test]
    fn a_run_with_no_output_keeps_the_placeholder() {
        let mut transcript = Transcript::new(DEFAULT_BANNER);
        transcript.begin_run();
        assert!(transcript.is_placeholder_visible());
        assert_eq!(transcript.rendered(), DEFAULT_BANNER);
    }
}
