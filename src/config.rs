use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::camera::{Camera, CameraKind, Transform3D};
use crate::vec::Vec3;

/// Settings of the `quadraster` binary. Every section and field is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub target: TargetConfig,
    pub camera: CameraConfig,
    pub threads: ThreadConfig,
    pub scene: SceneConfig,
}

impl RenderConfig {
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).with_context(|| format!("failed to read file {path:?}"))?;
        Self::from_toml_str(&contents).with_context(|| format!("invalid config in {path:?}"))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn build_camera(&self) -> crate::Result<Camera> {
        self.camera.build(self.target.width, self.target.height)
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TargetConfig {
    pub width: usize,
    pub height: usize,
    /// Packed RGBA, written as `"#rrggbb"` or `"#rrggbbaa"`.
    #[serde(deserialize_with = "detail::deser_color")]
    pub clear_color: u32,
    pub depth: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        TargetConfig {
            width: 512,
            height: 512,
            clear_color: 0xff00_0000,
            depth: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CameraConfig {
    pub kind: CameraKind,
    /// Perspective: half the horizontal view per unit of depth. Orthogonal: half the visible
    /// width.
    pub width_slope: f32,
    pub near: f32,
    pub far: f32,
    #[serde(deserialize_with = "detail::deser_vec3")]
    pub position: Vec3,
    /// Euler angles measured in degrees
    #[serde(deserialize_with = "detail::deser_vec3")]
    pub rotation: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            kind: CameraKind::Perspective,
            width_slope: 1.0,
            near: 0.1,
            far: 100.0,
            position: Vec3::default(),
            rotation: Vec3::default(),
        }
    }
}

impl CameraConfig {
    pub fn build(&self, width: usize, height: usize) -> crate::Result<Camera> {
        let transform = Transform3D::from_euler_degrees(self.position, self.rotation);
        match self.kind {
            CameraKind::Perspective => Camera::perspective(transform, width, height, self.width_slope, self.near, self.far),
            CameraKind::Orthogonal => Camera::orthogonal(transform, width, height, self.width_slope, self.near, self.far),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ThreadConfig {
    /// Zero means one thread per hardware thread.
    pub count: usize,
    pub jobs_per_thread: usize,
    pub min_rows_per_job: usize,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        ThreadConfig {
            count: 0,
            jobs_per_thread: 2,
            min_rows_per_job: 16,
        }
    }
}

impl ThreadConfig {
    /// Tiles to split a target of `height` rows into on a pool of `threads` workers.
    pub fn job_count(&self, threads: usize, height: usize) -> usize {
        let by_rows = height / self.min_rows_per_job.max(1);
        (threads * self.jobs_per_thread.max(1)).min(by_rows).max(1)
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SceneConfig {
    pub triangles: usize,
    pub seed: u64,
    /// Draw the scene alpha blended.
    pub alpha: bool,
    /// Side of the checkerboard texture, zero for untextured triangles.
    pub texture_size: usize,
    pub mipmaps: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            triangles: 1000,
            seed: 0,
            alpha: false,
            texture_size: 256,
            mipmaps: true,
        }
    }
}

mod detail {
    use serde::de::{Deserialize, Deserializer, Error};

    use crate::math_utils::parse_hex_color;
    use crate::vec::Vec3;

    pub fn deser_vec3<'de, D>(deserializer: D) -> Result<Vec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Vec3::from(<[f32; 3] as Deserialize>::deserialize(deserializer)?))
    }

    pub fn deser_color<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse_hex_color(&text).ok_or_else(|| Error::custom(format!("invalid color {text:?}, expected \"#rrggbb\" or \"#rrggbbaa\"")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = RenderConfig::from_toml_str("").unwrap();
        assert_eq!(config.target.width, 512);
        assert_eq!(config.threads.jobs_per_thread, 2);
        assert_eq!(config.camera.kind, CameraKind::Perspective);
        assert!(config.build_camera().is_ok());
    }

    #[test]
    fn sections_override_defaults() {
        let config = RenderConfig::from_toml_str(
            r##"
            [target]
            width = 64
            height = 32
            clear-color = "#102030"

            [camera]
            kind = "orthogonal"
            width-slope = 4.0
            position = [0.0, 1.0, -5.0]

            [threads]
            count = 3
            min-rows-per-job = 8

            [scene]
            triangles = 10
            alpha = true
            "##,
        )
        .unwrap();
        assert_eq!((config.target.width, config.target.height), (64, 32));
        assert_eq!(config.target.clear_color, 0xff30_2010);
        assert_eq!(config.camera.kind, CameraKind::Orthogonal);
        assert_eq!(config.camera.position, Vec3::new(0.0, 1.0, -5.0));
        assert_eq!(config.threads.count, 3);
        assert_eq!(config.threads.job_count(3, 32), 4);
        assert_eq!(config.threads.job_count(3, 480), 6);
        assert!(config.scene.alpha);
        assert_eq!(config.scene.seed, 0);
        assert!(!config.build_camera().unwrap().is_perspective());
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(RenderConfig::from_toml_str("[target]\nclear-color = \"red\"").is_err());
        assert!(RenderConfig::from_toml_str("[target]\nunknown = 1").is_err());
        let config = RenderConfig::from_toml_str("[camera]\nnear = 5.0\nfar = 1.0").unwrap();
        assert!(config.build_camera().is_err());
    }
}
