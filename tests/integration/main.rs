mod agents_test;
mod common;
mod health_test;
