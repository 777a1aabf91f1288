use rand::distr::{Alphanumeric, SampleString};

pub mod item;

pub mod step;

/// Generates a random name consisting of alphanumeric characters.
///
/// Used for steps built without an explicit name.
fn build_name() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 8)
}
