//! Capability profiles describing a GLSL target.
//!
//! A [`Profile`] is plain data: the version line to emit, the dialect generation that decides
//! which spellings are available, and the set of driver defects ([`Quirks`]) that need a
//! rewrite. Embedders usually load profiles from a configuration table, so every type here is
//! `serde`-compatible and missing fields fall back to [`Profile::default`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlslGeneration {
    V110,
    V130,
    V140,
    V150,
    V330,
    #[default]
    V400,
    V420,
    V450,
    Es100,
    Es300,
    Es310,
    Es320,
}

impl GlslGeneration {
    /// Dialects without `in`/`out` storage qualifiers or the overloaded `texture` entry point.
    pub fn is_legacy(self) -> bool {
        matches!(self, GlslGeneration::V110 | GlslGeneration::Es100)
    }
}

/// How the target lets a shader move the fragment-coordinate origin to the upper left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragCoordConvention {
    /// No origin control; a flipped coordinate has to be reconstructed from a height uniform.
    #[default]
    None,
    /// `layout(origin_upper_left)` behind `GL_ARB_fragment_coord_conventions`.
    LegacyExtension,
    /// `layout(origin_upper_left)` is core.
    ModernLayout,
}

bitflags! {
    /// Known target defects, each enabling one rewrite rule.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Quirks: u32 {
        /// `gl_FragCoord` cannot be read; route it through a vertex-stage varying.
        const CANNOT_USE_FRAG_COORD = 1 << 0;
        /// Loop conditions must be written as `(C) && true`.
        const REQUIRES_LOOP_CONDITION_AND_TRUE = 1 << 1;
        /// `&&` and `||` must be spelled as ternaries.
        const UNFOLDS_SHORT_CIRCUIT = 1 << 2;
        /// `do { } while` loops miscompile.
        const REWRITES_DO_WHILE = 1 << 3;
        /// Integer `abs` is broken.
        const EMULATES_INT_ABS = 1 << 4;
        /// `min(abs(x), y)` miscompiles when the calls are nested.
        const BREAKS_MIN_ABS_TOGETHER = 1 << 5;
        /// `fract` is wrong for negative inputs.
        const BREAKS_NEGATIVE_FRACT = 1 << 6;
        /// A unary-negated second `atan` operand is dropped.
        const FORCES_NEGATED_ATAN_OPERAND = 1 << 7;
        /// `pow` with a constant exponent is miscompiled.
        const REMOVES_CONSTANT_EXPONENT_POW = 1 << 8;
        /// Ternary expressions cannot be assignment targets.
        const LOWERS_TERNARY_LVALUES = 1 << 9;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Used in diagnostics only.
    pub name: String,
    /// Emitted verbatim as the first line, e.g. `#version 400`.
    pub version_decl: String,
    pub generation: GlslGeneration,
    pub uses_precision_modifiers: bool,
    pub force_high_precision: bool,
    pub frag_coord_convention: FragCoordConvention,
    pub sharpen_mipmap_levels: bool,
    pub supports_geometry_shaders: bool,
    pub supports_native_gs_invocations: bool,
    pub quirks: Quirks,
    pub standard_derivatives_extension: Option<String>,
    pub geometry_shader_extension: Option<String>,
    pub gs_invocations_extension: Option<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "default".to_owned(),
            version_decl: "#version 400".to_owned(),
            generation: GlslGeneration::V400,
            uses_precision_modifiers: false,
            force_high_precision: false,
            frag_coord_convention: FragCoordConvention::None,
            sharpen_mipmap_levels: false,
            supports_geometry_shaders: false,
            supports_native_gs_invocations: true,
            quirks: Quirks::empty(),
            standard_derivatives_extension: None,
            geometry_shader_extension: None,
            gs_invocations_extension: None,
        }
    }
}

impl Profile {
    pub const PRESET_NAMES: &'static [&'static str] = &[
        "default",
        "version_450_core",
        "version_110",
        "uses_precision_modifiers",
        "force_high_precision",
        "frag_coord_legacy_extension",
        "frag_coord_modern_layout",
        "cannot_use_frag_coord",
        "sharpen_mipmap_levels",
        "standard_derivatives_extension",
        "geometry_shaders",
        "no_gs_invocations",
        "gs_invocations_extension",
        "geometry_shader_extension",
        "loop_condition_and_true",
        "unfold_short_circuit",
        "rewrite_do_while",
        "emulate_int_abs",
        "min_abs_broken",
        "negative_fract_broken",
        "negated_atan_operand",
        "remove_constant_exponent_pow",
        "lowers_ternary_lvalues",
    ];

    /// Looks up one of the named targets in [`Profile::PRESET_NAMES`].
    pub fn preset(name: &str) -> Option<Profile> {
        let base = Profile {
            name: name.to_owned(),
            ..Profile::default()
        };
        let with_quirk = |quirks: Quirks| Profile {
            quirks,
            ..base.clone()
        };
        let geometry = Profile {
            supports_geometry_shaders: true,
            ..base.clone()
        };

        let profile = match name {
            "default" => base,
            "version_450_core" => Profile {
                version_decl: "#version 450 core".to_owned(),
                generation: GlslGeneration::V450,
                ..base
            },
            "version_110" => Profile {
                version_decl: "#version 110".to_owned(),
                generation: GlslGeneration::V110,
                ..base
            },
            "uses_precision_modifiers" => Profile {
                uses_precision_modifiers: true,
                ..base
            },
            "force_high_precision" => Profile {
                uses_precision_modifiers: true,
                force_high_precision: true,
                ..base
            },
            "frag_coord_legacy_extension" => Profile {
                version_decl: "#version 110".to_owned(),
                generation: GlslGeneration::V110,
                frag_coord_convention: FragCoordConvention::LegacyExtension,
                ..base
            },
            "frag_coord_modern_layout" => Profile {
                frag_coord_convention: FragCoordConvention::ModernLayout,
                ..base
            },
            "cannot_use_frag_coord" => with_quirk(Quirks::CANNOT_USE_FRAG_COORD),
            "sharpen_mipmap_levels" => Profile {
                sharpen_mipmap_levels: true,
                ..base
            },
            "standard_derivatives_extension" => Profile {
                version_decl: "#version 100".to_owned(),
                generation: GlslGeneration::Es100,
                uses_precision_modifiers: true,
                standard_derivatives_extension: Some("GL_OES_standard_derivatives".to_owned()),
                ..base
            },
            "geometry_shaders" => geometry,
            "no_gs_invocations" => Profile {
                supports_native_gs_invocations: false,
                ..geometry
            },
            "gs_invocations_extension" => Profile {
                gs_invocations_extension: Some("GL_ARB_gpu_shader5".to_owned()),
                ..geometry
            },
            "geometry_shader_extension" => Profile {
                version_decl: "#version 310es".to_owned(),
                generation: GlslGeneration::Es310,
                geometry_shader_extension: Some("GL_EXT_geometry_shader".to_owned()),
                ..geometry
            },
            "loop_condition_and_true" => with_quirk(Quirks::REQUIRES_LOOP_CONDITION_AND_TRUE),
            "unfold_short_circuit" => with_quirk(Quirks::UNFOLDS_SHORT_CIRCUIT),
            "rewrite_do_while" => with_quirk(Quirks::REWRITES_DO_WHILE),
            "emulate_int_abs" => with_quirk(Quirks::EMULATES_INT_ABS),
            "min_abs_broken" => with_quirk(Quirks::BREAKS_MIN_ABS_TOGETHER),
            "negative_fract_broken" => with_quirk(Quirks::BREAKS_NEGATIVE_FRACT),
            "negated_atan_operand" => with_quirk(Quirks::FORCES_NEGATED_ATAN_OPERAND),
            "remove_constant_exponent_pow" => with_quirk(Quirks::REMOVES_CONSTANT_EXPONENT_POW),
            "lowers_ternary_lvalues" => with_quirk(Quirks::LOWERS_TERNARY_LVALUES),
            _ => return None,
        };
        Some(profile)
    }

    pub fn has_quirk(&self, quirk: Quirks) -> bool {
        self.quirks.contains(quirk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_preset_resolves() {
        for name in Profile::PRESET_NAMES {
            let profile = Profile::preset(name).unwrap_or_else(|| panic!("missing preset {name}"));
            assert_eq!(profile.name, *name);
            assert!(profile.version_decl.starts_with("#version "));
        }
        assert_eq!(Profile::preset("no_such_target"), None);
    }

    #[test]
    fn quirk_presets_only_set_their_own_flag() {
        let profile = Profile::preset("min_abs_broken").unwrap();
        assert_eq!(profile.quirks, Quirks::BREAKS_MIN_ABS_TOGETHER);
        assert_eq!(profile.version_decl, "#version 400");
    }

    #[test]
    fn legacy_generations() {
        assert!(GlslGeneration::V110.is_legacy());
        assert!(GlslGeneration::Es100.is_legacy());
        assert!(!GlslGeneration::Es300.is_legacy());
        assert!(!GlslGeneration::V400.is_legacy());
    }

    #[test]
    fn profile_loads_from_partial_json() {
        let json = r##"{
            "name": "mobile",
            "version_decl": "#version 300 es",
            "generation": "es300",
            "uses_precision_modifiers": true,
            "quirks": "UNFOLDS_SHORT_CIRCUIT | REWRITES_DO_WHILE"
        }"##;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.generation, GlslGeneration::Es300);
        assert!(profile.uses_precision_modifiers);
        assert_eq!(
            profile.quirks,
            Quirks::UNFOLDS_SHORT_CIRCUIT | Quirks::REWRITES_DO_WHILE
        );
        assert_eq!(profile.frag_coord_convention, FragCoordConvention::None);
        assert!(profile.supports_native_gs_invocations);
    }

    #[test]
    fn profile_json_round_trips() {
        let profile = Profile::preset("geometry_shader_extension").unwrap();
        let json = serde_json::to_string(&profile).unwrap();
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
