use thiserror::Error;

/// Failures reported by [`Recty`](super::Recty).
///
/// Each variant carries the driver's diagnostic text verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The shader module failed to parse or validate.
    #[error("shader compilation failed: {0}")]
    Compile(String),

    /// Pipeline creation rejected the shader stages or the vertex layout.
    #[error("pipeline link failed: {0}")]
    Link(String),

    /// Any other error left pending on the device.
    #[error("device error in {label}: {message}")]
    Device { label: &'static str, message: String },
}

impl RenderError {
    /// Diagnostic text without the category prefix.
    pub fn diagnostic(&self) -> &str {
        match self {
            RenderError::Compile(msg) | RenderError::Link(msg) => msg,
            RenderError::Device { message, .. } => message,
        }
    }
}

/// Captures validation and out-of-memory errors raised between `push` and
/// [`finish`](ErrorScope::finish).
///
/// Scopes are a stack on the device; a scope must be finished before any
/// scope pushed earlier. An unfinished scope is popped on drop.
pub(crate) struct ErrorScope<'a> {
    device: &'a wgpu::Device,
    label: &'static str,
    open: bool,
}

impl<'a> ErrorScope<'a> {
    pub(crate) fn push(device: &'a wgpu::Device, label: &'static str) -> Self {
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        Self {
            device,
            label,
            open: true,
        }
    }

    /// Pops the scope and returns the first captured error message, if any.
    pub(crate) fn finish(mut self) -> Option<String> {
        self.open = false;
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());

        let err = validation.or(oom)?;
        let message = err.to_string();
        log::error!("wgpu error in '{}': {message}", self.label);
        Some(message)
    }

    /// Like [`finish`](Self::finish), mapped to [`RenderError::Device`].
    pub(crate) fn check(self) -> Result<(), RenderError> {
        let label = self.label;
        match self.finish() {
            Some(message) => Err(RenderError::Device { label, message }),
            None => Ok(()),
        }
    }
}

impl Drop for ErrorScope<'_> {
    fn drop(&mut self) {
        if self.open {
            log::warn!("error scope '{}' dropped without a check", self.label);
            let _ = pollster::block_on(self.device.pop_error_scope());
            let _ = pollster::block_on(self.device.pop_error_scope());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_and_diagnostic() {
        let err = RenderError::Compile("expected ';'".to_owned());
        assert_eq!(err.to_string(), "shader compilation failed: expected ';'");
        assert_eq!(err.diagnostic(), "expected ';'");
    }

    #[test]
    fn device_error_names_the_operation() {
        let err = RenderError::Device {
            label: "recty draw",
            message: "buffer too small".to_owned(),
        };
        assert_eq!(err.to_string(), "device error in recty draw: buffer too small");
        assert_eq!(err.diagnostic(), "buffer too small");
    }
}
