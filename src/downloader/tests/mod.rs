use super::test_helpers::*;
use crate::error::Error;
use crate::types::{BatchStart, BatchState, Event, ItemId, StopReason};
