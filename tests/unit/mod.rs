// Test harness tests - fixture loading, execution and comparison on the in-process engine
pub mod test_harness;
