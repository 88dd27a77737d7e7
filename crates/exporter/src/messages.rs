use std::collections::HashMap;
use tracing::info;

use crate::timefmt::format_ffmpeg_time;
use crate::transcoder::TranscodeEvent;

/// Ordered status lines for the user.
///
/// Lines are keyed by id; re-adding an id replaces its text in place, so a
/// progress line updates instead of piling up. Each ffmpeg run gets its own
/// slots, advanced with [`MessageManager::bump_ffmpeg_process_id`].
#[derive(Debug, Default)]
pub struct MessageManager {
    ids: Vec<String>,
    messages: HashMap<String, String>,
    log_count: u64,
    ffmpeg_process_id: u64,
}

impl MessageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: impl Into<String>, message: impl Into<String>) {
        let id = id.into();
        if !self.messages.contains_key(&id) {
            self.ids.push(id.clone());
        }
        self.messages.insert(id, message.into());
    }

    /// Drop every line. Counters keep running so new ids never collide.
    pub fn reset(&mut self) {
        self.ids.clear();
        self.messages.clear();
    }

    /// Lines in first-insertion order
    pub fn messages(&self) -> Vec<&str> {
        self.ids
            .iter()
            .filter_map(|id| self.messages.get(id).map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Append a new line, also emitted through tracing
    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.log_count += 1;
        let id = format!("log-{}", self.log_count);
        self.add(id, message);
    }

    pub fn ffmpeg_process_id(&self) -> u64 {
        self.ffmpeg_process_id
    }

    /// Start fresh slots for the next ffmpeg run
    pub fn bump_ffmpeg_process_id(&mut self) {
        self.ffmpeg_process_id += 1;
    }

    /// Fold a transcoder event into the current run's slots
    pub fn record(&mut self, event: &TranscodeEvent) {
        let pid = self.ffmpeg_process_id;
        match event {
            TranscodeEvent::Log(line) => {
                self.add(format!("ffmpeg-{}", pid), line.clone());
            }
            TranscodeEvent::Progress {
                out_time_secs,
                ratio,
                ..
            } => {
                let time = format_ffmpeg_time(*out_time_secs, true);
                let text = match ratio {
                    Some(r) => format!("Progress: {:.1}% ({})", r * 100.0, time),
                    None => format!("Processed: {}", time),
                };
                self.add(format!("ffmpeg-{}-progress", pid), text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_first_position() {
        let mut messages = MessageManager::new();
        messages.add("a", "first");
        messages.add("b", "second");
        messages.add("a", "updated");
        assert_eq!(messages.messages(), vec!["updated", "second"]);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_reset_clears_lines() {
        let mut messages = MessageManager::new();
        messages.log("one");
        messages.reset();
        assert!(messages.is_empty());
        messages.log("two");
        assert_eq!(messages.messages(), vec!["two"]);
    }

    #[test]
    fn test_log_lines_accumulate() {
        let mut messages = MessageManager::new();
        messages.log("Writing input files to ffmpeg...");
        messages.log("Reading output...");
        assert_eq!(
            messages.messages(),
            vec!["Writing input files to ffmpeg...", "Reading output..."]
        );
    }

    #[test]
    fn test_record_replaces_per_process() {
        let mut messages = MessageManager::new();
        messages.record(&TranscodeEvent::Log("frame=1".to_string()));
        messages.record(&TranscodeEvent::Log("frame=2".to_string()));
        messages.record(&TranscodeEvent::Progress {
            out_time_secs: 5.0,
            ratio: Some(0.5),
            speed: None,
        });
        assert_eq!(
            messages.messages(),
            vec!["frame=2", "Progress: 50.0% (00:00:05.000)"]
        );

        messages.bump_ffmpeg_process_id();
        messages.record(&TranscodeEvent::Log("frame=1".to_string()));
        messages.record(&TranscodeEvent::Progress {
            out_time_secs: 1.5,
            ratio: None,
            speed: Some(2.0),
        });
        assert_eq!(messages.ffmpeg_process_id(), 1);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages.messages()[3], "Processed: 00:00:01.500");
    }
}
