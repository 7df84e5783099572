use tracing::{debug, warn};

use relay_core::config::PersistenceConfig;
use relay_core::types::{Author, ChannelId, ChannelRef};
use relay_core::RelayError;

use crate::archive::PromptArchive;
use crate::transcript::TranscriptLog;
use crate::types::TranscriptRecord;

/// Best-effort durable side effects of a delivered reply.
///
/// Every method swallows its own errors after logging them: nothing here may
/// fail or delay the user-facing reply.
pub struct PersistenceSink {
    transcripts: Option<TranscriptLog>,
    prompts: Option<PromptArchive>,
}

impl PersistenceSink {
    pub fn new(transcripts: Option<TranscriptLog>, prompts: Option<PromptArchive>) -> Self {
        Self {
            transcripts,
            prompts,
        }
    }

    /// Build from config. `None` when both transcripts and prompt archival are off.
    pub fn from_config(config: &PersistenceConfig, retention: usize) -> Option<Self> {
        let transcripts = config
            .transcripts
            .then(|| TranscriptLog::new(&config.transcript_path));
        let prompts = config
            .raw_prompts
            .then(|| PromptArchive::new(&config.raw_prompt_dir, retention));

        if transcripts.is_none() && prompts.is_none() {
            return None;
        }
        Some(Self::new(transcripts, prompts))
    }

    pub async fn append_transcript(&self, record: TranscriptRecord) {
        let Some(ref log) = self.transcripts else {
            return;
        };
        match log.append(record).await {
            Ok(count) => debug!(path = %log.path().display(), count, "transcript appended"),
            Err(e) => {
                let err = RelayError::from(e);
                warn!(code = err.code(), error = %err, "transcript append failed");
            }
        }
    }

    pub async fn archive_raw_prompt(&self, prompt: &str, channel: &ChannelRef, author: &Author) {
        let Some(ref archive) = self.prompts else {
            return;
        };
        match archive.archive(prompt, channel, author).await {
            Ok(path) => debug!(path = %path.display(), "raw prompt archived"),
            Err(e) => {
                let err = RelayError::from(e);
                warn!(code = err.code(), error = %err, channel = %channel.id, "raw prompt archival failed");
            }
        }
    }

    /// Delete a channel's archived prompts (no-op when archival is off).
    pub async fn purge_channel(&self, channel_id: &ChannelId) {
        let Some(ref archive) = self.prompts else {
            return;
        };
        match archive.purge_channel(channel_id).await {
            Ok(true) => debug!(channel = %channel_id, "purged archived prompts"),
            Ok(false) => {}
            Err(e) => {
                let err = RelayError::from(e);
                warn!(code = err.code(), error = %err, channel = %channel_id, "prompt purge failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::types::InboundMessage;

    fn message() -> InboundMessage {
        InboundMessage {
            channel: ChannelRef {
                id: ChannelId::from("9"),
                name: Some("general".into()),
                server: Some("Guild".into()),
            },
            author: Author {
                id: "1".into(),
                username: "alice".into(),
                display_name: "Alice".into(),
            },
            content: "hello".into(),
        }
    }

    #[test]
    fn disabled_config_builds_nothing() {
        assert!(PersistenceSink::from_config(&PersistenceConfig::default(), 10).is_none());
    }

    #[tokio::test]
    async fn transcript_record_carries_message_identity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("t.json");
        let sink = PersistenceSink::new(Some(TranscriptLog::new(&path)), None);

        let msg = message();
        sink.append_transcript(TranscriptRecord::new(&msg, "hi there")).await;

        let records = TranscriptLog::new(&path).read_all().await.expect("read");
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.user.username, "alice");
        assert_eq!(r.server, "Guild");
        assert_eq!(r.channel.name, "general");
        assert_eq!(r.channel.id, "9");
        assert_eq!(r.message, "hello");
        assert_eq!(r.response, "hi there");
    }

    #[tokio::test]
    async fn write_failures_are_swallowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory where the transcript file should be makes the rename fail.
        let path = dir.path().join("t.json");
        std::fs::create_dir(&path).expect("mkdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a dir").expect("seed");

        let sink = PersistenceSink::new(
            Some(TranscriptLog::new(&path)),
            Some(PromptArchive::new(&blocker, 10)),
        );
        let msg = message();
        sink.append_transcript(TranscriptRecord::new(&msg, "x")).await;
        sink.archive_raw_prompt("p", &msg.channel, &msg.author).await;
        sink.purge_channel(&msg.channel.id).await;
    }
}
