use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn get_host() -> cpal::Host {
    cpal::default_host()
}

pub fn get_or_default_input(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());
    match device_name {
        Some(target) => host
            .input_devices()?
            .find(|d| d.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow::anyhow!("input device {target:?} not found")),
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("no input device available")),
    }
}

pub fn get_or_default_output(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    match device_name {
        Some(target) => host
            .output_devices()?
            .find(|d| d.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow::anyhow!("output device {target:?} not found")),
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("no output device available")),
    }
}

pub fn get_available_inputs() -> anyhow::Result<String> {
    for host in cpal::available_hosts() {
        tracing::debug!("Available host: {:?}", host);
    }

    let host = get_host();
    let default_device = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let mut device_names: Vec<String> = Vec::new();
    for in_device in host.input_devices()? {
        let d_name = in_device.name()?;
        let d_cfg = in_device.default_input_config()?;
        let d_sampling_rate = d_cfg.sample_rate().0;
        let d_ch = d_cfg.channels();

        let mut d = format!(" * {}({}ch, {}hz)", d_name, d_ch, d_sampling_rate);
        if d_name == default_device {
            d.push_str(" [default]");
        }
        device_names.push(d);
    }
    Ok(device_names.join("\n"))
}

pub fn get_available_outputs() -> anyhow::Result<String> {
    for host in cpal::available_hosts() {
        tracing::debug!("Available host: {:?}", host);
    }

    let host = get_host();
    let default_device = host
        .default_output_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();

    let mut device_names: Vec<String> = Vec::new();
    for out_device in host.output_devices()? {
        let d_name = out_device.name()?;
        let d_cfg = out_device.default_output_config()?;
        let d_sampling_rate = d_cfg.sample_rate().0;
        let d_ch = d_cfg.channels();

        let mut d = format!(" * {}({}ch, {}hz)", d_name, d_ch, d_sampling_rate);
        if d_name == default_device {
            d.push_str(" [default]");
        }
        device_names.push(d);
    }
    Ok(device_names.join("\n"))
}
