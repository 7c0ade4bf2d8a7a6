/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Inert types sent around and inspected by the protocol, but with no active behavior of
//! their own.
//!
//! [basic](crate::types::basic) defines the newtypes and enumerations every other module
//! builds on, while [message](crate::types::message) defines the records that cross the
//! wire and the records handed to the state machine.

pub mod basic;

pub mod message;
