// Events that flow from background tasks back into the TUI
//
// Every network call (image loading, classification, chat) runs on a spawned
// task. The task never touches UI state directly; it reports through an
// `AppEvent` on the app channel and the event loop applies it. Pipeline
// progress does not travel here: the TUI watches the pipeline snapshot.

use crate::analysis::{ChartImage, Classification};
use crate::chat::SessionId;
use crate::vision::VisionError;

#[derive(Debug)]
pub enum AppEvent {
    /// Files read from disk; per-path failures are already formatted
    ImagesLoaded {
        images: Vec<ChartImage>,
        errors: Vec<String>,
    },

    /// One upload finished classification
    ImageClassified {
        upload_id: u64,
        outcome: Classification,
    },

    /// The classification task drained its queue
    ClassificationFinished,

    /// The pipeline run ended (the snapshot already carries the details)
    AnalysisFinished { error: Option<String> },

    /// Reply for a chat question
    ChatReply {
        session: SessionId,
        reply: Result<String, VisionError>,
    },
}
