/// How a rectangle record becomes a quad.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Expansion {
    /// One instance per record; the vertex stage picks the corner from the
    /// vertex index. Uploads 40 bytes per rectangle.
    #[default]
    Instanced,
    /// The CPU writes four vertices and six indices per record. Uploads
    /// 152 bytes per rectangle but needs nothing beyond plain vertex input.
    Host,
}

/// Color blending against the target.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Blend {
    /// Overwrite the target (no blending).
    #[default]
    Replace,
    /// `src + dst * (1 - src.a)`, for premultiplied colors.
    PremultipliedAlpha,
}

impl Blend {
    pub(crate) fn state(self) -> wgpu::BlendState {
        match self {
            Blend::Replace => wgpu::BlendState::REPLACE,
            Blend::PremultipliedAlpha => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        }
    }
}

/// When device errors are checked.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorChecks {
    /// Only during [`Recty::init`](super::Recty::init).
    InitOnly,
    /// Also on every draw: the target format is compared with the
    /// pipeline's, and errors from creating the draw's transform and vertex
    /// buffers are captured. Each check waits on the device, so this costs
    /// a round trip per draw. Render-pass validation is still reported when
    /// the caller finishes its encoder.
    EveryCall,
}

impl Default for ErrorChecks {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            ErrorChecks::EveryCall
        } else {
            ErrorChecks::InitOnly
        }
    }
}

/// Renderer configuration.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct RectyConfig {
    pub expansion: Expansion,

    /// Add a texture sample to every fragment.
    ///
    /// A 1×1 transparent placeholder is bound until
    /// [`Recty::bind_texture`](super::Recty::bind_texture) is called, so the
    /// sample contributes nothing by default.
    pub textured: bool,

    pub blend: Blend,

    pub error_checks: ErrorChecks,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_untextured_instanced_replace() {
        let config = RectyConfig::default();
        assert_eq!(config.expansion, Expansion::Instanced);
        assert!(!config.textured);
        assert_eq!(config.blend, Blend::Replace);
    }

    #[test]
    fn error_checks_follow_build_profile() {
        let expected = if cfg!(debug_assertions) {
            ErrorChecks::EveryCall
        } else {
            ErrorChecks::InitOnly
        };
        assert_eq!(ErrorChecks::default(), expected);
    }

    #[test]
    fn premultiplied_blend_uses_one_minus_src_alpha() {
        let state = Blend::PremultipliedAlpha.state();
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(Blend::Replace.state(), wgpu::BlendState::REPLACE);
    }
}
