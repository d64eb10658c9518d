pub mod common;

mod comparator_test;
mod fixture_test;
mod suite_run_test;
