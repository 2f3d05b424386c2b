use std::path::PathBuf;
use std::time::Duration;

use crate::engine::blur::BlurSettings;

/// Canvas construction parameters. Only the size is required.
#[derive(Clone, Debug, PartialEq, bon::Builder)]
pub struct CanvasConfig {
	pub width: u32,
	pub height: u32,

	/// `Changed` events arriving sooner than this after the last handled one are dropped.
	#[builder(default = Duration::from_millis(16))]
	pub changed_interval: Duration,

	/// How long a history slice stays in memory before it is written to disk.
	#[builder(default = Duration::from_secs(2))]
	pub slice_eviction_delay: Duration,

	#[builder(default = 256)]
	pub blur_max_dimension: u32,

	#[builder(default = 7)]
	pub blur_radius: u32,

	#[builder(default = 2)]
	pub blur_passes: u32,

	/// Where evicted slices go. The system temporary directory when unset.
	pub slice_directory: Option<PathBuf>,
}

impl CanvasConfig {
	pub fn blur_settings(&self) -> BlurSettings {
		BlurSettings {
			max_dimension: self.blur_max_dimension,
			radius: self.blur_radius,
			passes: self.blur_passes,
		}
	}

	pub fn size(&self) -> (u32, u32) {
		(self.width, self.height)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = CanvasConfig::builder().width(300).height(200).build();
		assert_eq!(config.size(), (300, 200));
		assert_eq!(config.changed_interval, Duration::from_millis(16));
		assert_eq!(config.slice_eviction_delay, Duration::from_secs(2));
		assert_eq!(
			config.blur_settings(),
			BlurSettings {
				max_dimension: 256,
				radius: 7,
				passes: 2
			}
		);
		assert_eq!(config.slice_directory, None);
	}
}
