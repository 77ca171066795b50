mod object_turn_store;

pub use object_turn_store::ObjectTurnStore;
