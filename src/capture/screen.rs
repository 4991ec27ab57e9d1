//! Primary-monitor capture using the Windows Graphics Capture API.
//!
//! A capture session stays open for the whole run; `capture()` drains the
//! frame pool and converts the newest frame to RGBA. When no new frame has
//! arrived since the last call, the previous frame is returned so callers
//! always see latest-frame semantics without blocking.

use anyhow::{anyhow, Context, Result};
use image::{ImageBuffer, Rgba};

use windows::core::Interface;
use windows::Graphics::Capture::{
    Direct3D11CaptureFramePool, GraphicsCaptureItem, GraphicsCaptureSession,
};
use windows::Graphics::DirectX::DirectXPixelFormat;
use windows::Win32::Foundation::POINT;
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAP_READ, D3D11_SDK_VERSION,
    D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Gdi::{MonitorFromPoint, MONITOR_DEFAULTTOPRIMARY};
use windows::Win32::System::WinRT::Direct3D11::CreateDirect3D11DeviceFromDXGIDevice;
use windows::Win32::System::WinRT::Graphics::Capture::IGraphicsCaptureItemInterop;

use super::{Frame, FrameSource};

/// Persistent screen capture session for the primary monitor.
pub struct ScreenCapture {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    frame_pool: Direct3D11CaptureFramePool,
    session: GraphicsCaptureSession,
    last_frame: Option<Frame>,
}

impl ScreenCapture {
    /// Opens a capture session on the primary monitor and starts it.
    pub fn primary_monitor() -> Result<Self> {
        let (device, context) = create_d3d11_device()?;
        let item = create_monitor_capture_item()?;
        let size = item.Size()?;
        crate::log(&format!("Capture size: {}x{}", size.Width, size.Height));

        let d3d_device = create_direct3d_device(&device)?;
        // Two buffers so a frame can be read while the next one lands.
        let frame_pool = Direct3D11CaptureFramePool::CreateFreeThreaded(
            &d3d_device,
            DirectXPixelFormat::B8G8R8A8UIntNormalized,
            2,
            size,
        )?;
        let session = frame_pool.CreateCaptureSession(&item)?;
        session.StartCapture()?;

        Ok(Self {
            device,
            context,
            frame_pool,
            session,
            last_frame: None,
        })
    }

    /// Converts a captured D3D11 texture to an RGBA image buffer.
    fn texture_to_frame(&self, texture: &ID3D11Texture2D) -> Result<Frame> {
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.Width,
            Height: desc.Height,
            MipLevels: 1,
            ArraySize: 1,
            Format: desc.Format,
            SampleDesc: desc.SampleDesc,
            Usage: D3D11_USAGE_STAGING,
            BindFlags: Default::default(),
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: Default::default(),
        };

        let staging = unsafe {
            let mut staging: Option<ID3D11Texture2D> = None;
            self.device
                .CreateTexture2D(&staging_desc, None, Some(&mut staging))?;
            staging.ok_or_else(|| anyhow!("Failed to create staging texture"))?
        };

        unsafe {
            self.context.CopyResource(
                &staging.cast::<ID3D11Resource>()?,
                &texture.cast::<ID3D11Resource>()?,
            );
        }

        let mapped = unsafe {
            let mut mapped = Default::default();
            self.context.Map(
                &staging.cast::<ID3D11Resource>()?,
                0,
                D3D11_MAP_READ,
                0,
                Some(&mut mapped),
            )?;
            mapped
        };

        let width = desc.Width;
        let height = desc.Height;
        let row_pitch = mapped.RowPitch as usize;
        let src_data = unsafe {
            std::slice::from_raw_parts(mapped.pData as *const u8, row_pitch * height as usize)
        };

        let mut img: Frame = ImageBuffer::new(width, height);
        for y in 0..height {
            let row = &src_data[y as usize * row_pitch..];
            for x in 0..width {
                let offset = x as usize * 4;
                // BGRA -> RGBA
                let b = row[offset];
                let g = row[offset + 1];
                let r = row[offset + 2];
                let a = row[offset + 3];
                img.put_pixel(x, y, Rgba([r, g, b, a]));
            }
        }

        unsafe {
            self.context.Unmap(&staging.cast::<ID3D11Resource>()?, 0);
        }

        Ok(img)
    }

    /// Drains the frame pool and returns the newest frame, if any arrived.
    fn try_next_frame(&mut self) -> Result<Option<Frame>> {
        let mut latest = None;
        // Drain so a slow poll cadence never reads a stale backlog.
        while let Ok(frame) = self.frame_pool.TryGetNextFrame() {
            latest = Some(frame);
        }
        let Some(frame) = latest else {
            return Ok(None);
        };

        let surface = frame.Surface()?;
        let access: windows::Win32::System::WinRT::Direct3D11::IDirect3DDxgiInterfaceAccess =
            surface.cast()?;
        let texture: ID3D11Texture2D = unsafe { access.GetInterface()? };

        Ok(Some(self.texture_to_frame(&texture)?))
    }
}

impl FrameSource for ScreenCapture {
    fn capture(&mut self) -> Option<Frame> {
        match self.try_next_frame() {
            Ok(Some(frame)) => {
                self.last_frame = Some(frame);
            }
            Ok(None) => {}
            Err(e) => {
                crate::log(&format!("Frame conversion failed: {}", e));
            }
        }
        self.last_frame.clone()
    }
}

impl Drop for ScreenCapture {
    fn drop(&mut self) {
        let _ = self.session.Close();
        let _ = self.frame_pool.Close();
    }
}

/// Creates a Direct3D 11 device and immediate context.
fn create_d3d11_device() -> Result<(ID3D11Device, ID3D11DeviceContext)> {
    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;

    unsafe {
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            None,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )?;
    }

    Ok((
        device.ok_or_else(|| anyhow!("Failed to create D3D11 device"))?,
        context.ok_or_else(|| anyhow!("Failed to create D3D11 context"))?,
    ))
}

/// Creates a WinRT Direct3D device wrapper from a D3D11 device.
fn create_direct3d_device(
    device: &ID3D11Device,
) -> Result<windows::Graphics::DirectX::Direct3D11::IDirect3DDevice> {
    let dxgi_device: windows::Win32::Graphics::Dxgi::IDXGIDevice = device.cast()?;
    let inspectable = unsafe { CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device)? };
    inspectable
        .cast()
        .context("Failed to cast to IDirect3DDevice")
}

/// Creates a GraphicsCaptureItem for the primary monitor.
///
/// Regions and click coordinates are absolute screen pixels, so the whole
/// monitor is captured rather than a single window.
fn create_monitor_capture_item() -> Result<GraphicsCaptureItem> {
    let monitor =
        unsafe { MonitorFromPoint(POINT { x: 0, y: 0 }, MONITOR_DEFAULTTOPRIMARY) };

    let class_name = windows::core::h!("Windows.Graphics.Capture.GraphicsCaptureItem");
    let interop: IGraphicsCaptureItemInterop = unsafe {
        windows::Win32::System::WinRT::RoGetActivationFactory(class_name)
            .context("Failed to get IGraphicsCaptureItemInterop")?
    };

    unsafe {
        interop
            .CreateForMonitor(monitor)
            .context("Failed to create capture item for primary monitor")
    }
}
