// switchyard/src/conditional/mod.rs

//! Branching steps.
//!
//! `branch` holds the links whose branches rejoin the main chain (`If`, `IfElse`,
//! `Switch`); `fork` holds the exclusive routers whose branches are independent closed
//! pipelines (`Fork`, `MultiFork`).

pub(crate) mod branch;
pub(crate) mod fork;
