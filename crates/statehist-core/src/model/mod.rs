pub mod annotation;
pub mod rule;
pub mod state;
pub mod transition;

pub use annotation::{ALERT_ANNOTATION_TYPE, AccessResources, AnnotationItem, ItemQuery};
pub use rule::RuleMeta;
pub use state::{InvalidState, State, format_state, parse_formatted_state};
pub use transition::StateTransition;
