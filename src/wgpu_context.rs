#[derive(Clone, Debug, thiserror::Error)]
pub enum GpuContextError {
	#[error("no graphics adapter is available")]
	NoAdapter,

	#[error("the adapter refused a device: {0}")]
	Device(String),

	#[error("a {width}x{height} canvas exceeds the {max} pixel texture limit")]
	CanvasTooLarge { width: u32, height: u32, max: u32 },
}

static_assertions::assert_impl_all!(GpuContextError: std::error::Error, Send, Sync);

impl From<wgpu::RequestDeviceError> for GpuContextError {
	fn from(value: wgpu::RequestDeviceError) -> Self {
		GpuContextError::Device(value.to_string())
	}
}

/// Headless device and queue. Brushes only ever draw into offscreen textures that are read
/// back, so no surface or instance is kept around.
#[derive(Debug)]
pub struct GpuContext {
	adapter_info: wgpu::AdapterInfo,
	device: wgpu::Device,
	queue: wgpu::Queue,
}

impl GpuContext {
	#[tracing::instrument(err)]
	pub async fn new() -> Result<Self, GpuContextError> {
		let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
			flags: wgpu::InstanceFlags::from_build_config().with_env(),
			..Default::default()
		});
		let adapter = instance
			.request_adapter(&wgpu::RequestAdapterOptions {
				power_preference: wgpu::PowerPreference::LowPower,
				..Default::default()
			})
			.await
			.ok_or(GpuContextError::NoAdapter)?;
		let adapter_info = adapter.get_info();
		tracing::debug!(adapter = %adapter_info.name, backend = ?adapter_info.backend, "selected adapter");

		let (device, queue) = adapter
			.request_device(
				&wgpu::DeviceDescriptor {
					label: Some("sketchpad"),
					required_limits: wgpu::Limits::downlevel_defaults()
						.using_resolution(adapter.limits()),
					..Default::default()
				},
				None,
			)
			.await?;

		Ok(Self {
			adapter_info,
			device,
			queue,
		})
	}

	pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
		&self.adapter_info
	}

	pub fn device(&self) -> &wgpu::Device {
		&self.device
	}

	pub fn queue(&self) -> &wgpu::Queue {
		&self.queue
	}

	/// The offscreen drawable is one texture the size of the canvas.
	pub fn check_canvas_size(&self, width: u32, height: u32) -> Result<(), GpuContextError> {
		let max = self.device.limits().max_texture_dimension_2d;
		if width > max || height > max {
			return Err(GpuContextError::CanvasTooLarge { width, height, max });
		}
		Ok(())
	}

	/// Blocks until all submitted work has finished executing.
	pub fn barrier(&self) {
		self.device.poll(wgpu::Maintain::wait()).panic_on_timeout()
	}
}
