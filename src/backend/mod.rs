//! Debugger backend and page resource interfaces
//!
//! The transport to a live runtime is outside this crate. The presentation
//! model only talks to these traits, which a protocol client implements.

pub mod types;

use async_trait::async_trait;
use serde_json::Value;

use crate::common::Result;

pub use types::*;

/// Requests the presentation model issues to a script debugger
#[async_trait]
pub trait DebuggerBackend: Send + Sync {
    /// Set a breakpoint on every unit loaded from `url`
    ///
    /// `Ok(None)` means the backend declined to create one.
    async fn set_breakpoint_by_url(
        &self,
        url: &str,
        line: u32,
        column: u32,
        condition: &str,
        enabled: bool,
    ) -> Result<Option<BackendBreakpoint>>;

    /// Set a breakpoint on a unit that has no URL
    async fn set_breakpoint_by_unit_id(
        &self,
        unit_id: &str,
        line: u32,
        column: u32,
        condition: &str,
        enabled: bool,
    ) -> Result<Option<BackendBreakpoint>>;

    async fn remove_breakpoint(&self, id: &str) -> Result<()>;

    /// Replace a unit's source in the running program
    async fn edit_unit_source(&self, unit_id: &str, new_text: &str) -> Result<()>;

    async fn fetch_unit_source(&self, unit_id: &str) -> Result<String>;

    async fn evaluate_in_frame(&self, frame_id: &str, expression: &str) -> Result<Value>;

    async fn continue_to_location(&self, location: &RawLocation) -> Result<()>;

    /// Make `frame_id` the evaluation context for console expressions
    async fn select_call_frame(&self, _frame_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Access to the page resources that back source URLs
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// State of the resource loaded from `url`, if the page has one
    fn resource(&self, url: &str) -> Option<ResourceInfo>;

    async fn fetch_resource_content(&self, url: &str) -> Result<String>;
}

/// Resource provider for targets without a page (workers, node-like runtimes)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResources;

#[async_trait]
impl ResourceProvider for NoResources {
    fn resource(&self, _url: &str) -> Option<ResourceInfo> {
        None
    }

    async fn fetch_resource_content(&self, url: &str) -> Result<String> {
        Err(crate::common::Error::content_unavailable(
            url,
            "no page resources available",
        ))
    }
}
