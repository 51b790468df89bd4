//! the test_utils folder here will share utils or test components between unit
//! tests

pub use common::*;
