//! Narration playback on the default audio output.

use quill_core::Pcm16;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use thiserror::Error;

/// Errors from narration playback.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("No audio output: {0}")]
    Output(#[from] rodio::StreamError),

    #[error("Could not start playback: {0}")]
    Play(#[from] rodio::PlayError),

    #[error("Narration is empty")]
    Empty,
}

/// Plays one narration at a time. The output device is opened on first use.
#[derive(Default)]
pub struct Narrator {
    output: Option<(OutputStream, OutputStreamHandle)>,
    sink: Option<Sink>,
}

impl Narrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playing `pcm`, cutting off anything already playing.
    ///
    /// Returns immediately; the samples play on the output's own thread.
    pub fn play(&mut self, pcm: &Pcm16) -> Result<(), PlaybackError> {
        if pcm.is_empty() {
            return Err(PlaybackError::Empty);
        }
        self.stop();

        let handle = match &self.output {
            Some((_, handle)) => handle.clone(),
            None => {
                let (stream, handle) = OutputStream::try_default()?;
                self.output = Some((stream, handle.clone()));
                handle
            }
        };

        let sink = Sink::try_new(&handle)?;
        sink.append(SamplesBuffer::new(1, pcm.sample_rate(), pcm.normalized()));
        self.sink = Some(sink);
        Ok(())
    }

    /// Silence the current narration. Returns false when nothing was playing.
    pub fn stop(&mut self) -> bool {
        match self.sink.take() {
            Some(sink) => {
                let was_playing = !sink.empty();
                sink.stop();
                was_playing
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::audio::DEFAULT_SAMPLE_RATE;

    #[test]
    fn test_empty_narration_is_rejected_without_opening_output() {
        let mut narrator = Narrator::new();
        let pcm = Pcm16::from_bytes(&[], DEFAULT_SAMPLE_RATE);

        assert!(matches!(narrator.play(&pcm), Err(PlaybackError::Empty)));
        assert!(narrator.output.is_none());
    }

    #[test]
    fn test_stop_when_idle() {
        let mut narrator = Narrator::new();
        assert!(!narrator.stop());
        assert!(narrator.sink.is_none());
    }
}
