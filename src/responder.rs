// src/responder.rs
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::MockConfig;
use crate::session::{ConverterMode, GenerationOptions, MessageKind};
use crate::summary::build_summary;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub chat_id: String,
    pub prompt: String,
    pub options: GenerationOptions,
    pub mode: Option<ConverterMode>,
}

/// Output of one simulated generation, tagged with the chat that asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub chat_id: String,
    pub kind: MessageKind,
    pub content: String,
}

pub fn compose_response(request: &GenerationRequest, assets: &MockConfig, sequence: u64) -> Completion {
    let (kind, content) = match request.mode {
        Some(ConverterMode::Summary) => (MessageKind::Text, build_summary(&request.prompt, &request.options)),
        Some(ConverterMode::Image) => (MessageKind::Image, assets.image_url.clone()),
        Some(ConverterMode::Video) => (MessageKind::Video, assets.video_url.clone()),
        Some(ConverterMode::Audio) => (MessageKind::Audio, assets.audio_url.clone()),
        Some(ConverterMode::Sign) => (MessageKind::Video, assets.sign_url.clone()),
        None if sequence % 2 == 0 => (MessageKind::Image, assets.image_url.clone()),
        None => (MessageKind::Video, assets.video_url.clone()),
    };
    Completion { chat_id: request.chat_id.clone(), kind, content }
}

#[derive(Debug)]
pub struct MockResponder {
    config: MockConfig,
    tx: UnboundedSender<Completion>,
    issued: u64,
}

impl MockResponder {
    pub fn new(config: MockConfig) -> (Self, UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MockResponder { config, tx, issued: 0 }, rx)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.config.delay_ms)
    }

    /// Fires a completion after the configured delay. Scheduled work is never cancelled.
    pub fn schedule(&mut self, request: GenerationRequest) {
        let completion = compose_response(&request, &self.config, self.issued);
        self.issued += 1;
        let delay = self.delay();
        let tx = self.tx.clone();
        log::debug!("Scheduling {:?} response for chat {} in {:?}", completion.kind, request.chat_id, delay);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(completion).is_err() {
                log::warn!("Dropped a mock response: receiver is gone");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: Option<ConverterMode>) -> GenerationRequest {
        GenerationRequest {
            chat_id: "c1".to_string(),
            prompt: "the quick brown fox jumps over the lazy dog".to_string(),
            options: GenerationOptions::default(),
            mode,
        }
    }

    #[test]
    fn unselected_mode_alternates_image_and_video() {
        let assets = MockConfig::default();
        let kinds: Vec<MessageKind> = (0..4).map(|n| compose_response(&request(None), &assets, n).kind).collect();
        assert_eq!(kinds, vec![MessageKind::Image, MessageKind::Video, MessageKind::Image, MessageKind::Video]);
    }

    #[test]
    fn converter_modes_pick_their_asset() {
        let assets = MockConfig::default();
        let sign = compose_response(&request(Some(ConverterMode::Sign)), &assets, 0);
        assert_eq!((sign.kind, sign.content.as_str()), (MessageKind::Video, assets.sign_url.as_str()));
        let audio = compose_response(&request(Some(ConverterMode::Audio)), &assets, 0);
        assert_eq!(audio.kind, MessageKind::Audio);
        let summary = compose_response(&request(Some(ConverterMode::Summary)), &assets, 0);
        assert_eq!(summary.kind, MessageKind::Text);
        assert!(summary.content.ends_with("9 words condensed to 2."));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_arrives_after_the_delay() {
        let (mut responder, mut rx) = MockResponder::new(MockConfig { delay_ms: 2000, ..Default::default() });
        let started = tokio::time::Instant::now();
        responder.schedule(request(Some(ConverterMode::Image)));
        assert!(rx.try_recv().is_err());

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.chat_id, "c1");
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }
}
