//! Code under test for the `basic` and `fixture` packages
//!
//! Sums wrap on overflow, so out-of-range fixture values surface as wrong
//! results rather than panics.

pub fn add(l: i64, r: i64) -> i64 {
    l.wrapping_add(r)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Adder;

impl Adder {
    pub fn add(&self, l: i64, r: i64) -> i64 {
        add(l, r)
    }

    pub fn add_multi(&self, n: &[i64]) -> i64 {
        n.iter().fold(0, |sum, &x| add(sum, x))
    }
}
