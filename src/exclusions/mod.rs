pub mod selector;
pub mod store;

pub use selector::{
    AcceptAll, AcceptNone, ExclusionSelector, PresetSelector, PromptSelector, RemainingElements,
};
pub use store::{ExclusionSet, ExclusionStore, ExclusionUpdate};
