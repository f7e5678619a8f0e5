//! HTTP integration tests: the full router, pipeline, and worker running
//! in-process against a local object store.

mod helpers;
mod job_test;
mod upload_test;
