//! Thread and comment reconciliation.
//!
//! Maps each intended comment onto the PR's existing discussion state:
//! reply into the right thread, open a new one, or suppress the posting
//! entirely when an equivalent comment already exists. All state is rebuilt
//! per session from the host's listings plus the hidden checkpoint marker
//! in a prior summary; nothing persists across runs.
//!
//! ## Components
//!
//! - [`index`]: location and activity indices over the session listings
//! - [`post`]: the posting algorithm, dedup keys, and outcome variants
//! - [`marker`]: summary footer and checkpoint marker handling

pub mod index;
pub mod marker;
pub mod post;

pub use index::{CommentIndex, SYNTHETIC_THREAD_PREFIX};
pub use marker::{
    DEFAULT_ATTRIBUTION, MARKER_PREFIX, checkpoint_marker, complete_footer, extract_checkpoint,
    extract_checkpoint_from_comments,
};
pub use post::{
    CommentRequest, PostOutcome, Reconciler, ThreadCandidate, dedup_key, render_suggestion,
};
