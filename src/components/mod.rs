//! The rule chain editor component and its state machine.

pub mod rule_graph;
