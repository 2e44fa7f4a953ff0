/*!
Test harness for the Inventa agent

Makes agent tests cheap to write:
- Recording publisher stub with failure injection
- Filesystem fixtures for discovery roots, declared inventory and
  ignore files
*/

pub mod fixtures;
pub mod publisher_stub;

pub use fixtures::HostFixture;
pub use publisher_stub::{PublishedSnapshot, RecordingPublisher};
