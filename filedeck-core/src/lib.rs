pub mod error;

pub mod config;

pub mod model {
    pub mod media;
    pub use media::{Content, MediaType};

    pub mod record;
    pub use record::{FileRecord, RecordDraft, RecordId};

    pub mod store;
    pub use store::{FileStore, SharedStore, SortOrder, StoreStats};
}

pub mod ingest {
    pub mod source;
    pub use source::{DirectorySource, FileSource, HostEntry, RawFile};

    pub mod discover;
    pub use discover::discover;

    pub mod validate;
    pub use validate::validate;

    pub mod summary;
    pub use summary::{BatchSummary, FileOutcome, FileReport, IngestStage, RejectClass};

    pub mod pipeline;
    pub use pipeline::IngestPipeline;
}

pub mod search {
    mod fold;

    pub mod highlight;
    pub use highlight::{Segment, highlight};

    pub mod index;
    pub use index::{MatchField, SearchIndex, SearchMatch};
}

pub mod tree {
    pub mod node;
    pub use node::{RowKind, TreeNode, TreeRow};

    pub mod projector;
    pub use projector::{ConflictKind, Projection, TreeConflict, TreeProjector};
}

pub mod host {
    pub mod local;

    pub mod memory;
    pub use memory::{MemoryDir, MemoryFile};
}

pub mod notify;

pub mod prefs;

pub mod export;

pub mod context;
pub use context::FileDeck;

pub mod logging;
pub use logging::Logger;

pub use error::{DeckError, DeckResult};
