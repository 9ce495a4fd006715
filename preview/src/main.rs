//! Desktop preview for strip-bridge
//!
//! Plays a host that streams an Adalight rainbow into the parser, runs the
//! transmit engine against the simulated generator and draws the pixels
//! decoded from the resulting waveform.

use std::time::Instant as StdInstant;

use eframe::egui::{self};
use strip_bridge::color::{Hsv, hsv2rgb};
use strip_bridge::engine::NoCallback;
use strip_bridge::ingest::{ADALIGHT_MAGIC, CHECKSUM_KEY};
use strip_bridge::sim::{SimulatedGenerator, WaveformCapture, pump_until_idle};
use strip_bridge::{
    AdalightParser, Instant, RefreshLength, Rgb, SharedEngine, StripBridge, TransmitEngine,
    WS2812_72MHZ,
};

/// Largest strip the engine drives
const MAX_LEDS: usize = 300;

/// Default number of LEDs the host sends
const DEFAULT_LED_COUNT: usize = 60;

/// Size of each LED rectangle in pixels
const LED_SIZE: f32 = 12.0;

/// Gap between LEDs
const LED_GAP: f32 = 2.0;

/// Pause the host inserts mid-frame when gap injection is on
const INJECTED_GAP_MS: u64 = 20;

static ENGINE: SharedEngine<SimulatedGenerator, MAX_LEDS> =
    SharedEngine::new(TransmitEngine::new(SimulatedGenerator::new(), WS2812_72MHZ));

type Parser =
    AdalightParser<StripBridge<'static, SimulatedGenerator, MAX_LEDS, NoCallback>>;

fn main() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 600.0])
            .with_title("Strip Bridge Preview"),
        ..Default::default()
    };

    eframe::run_native(
        "strip-bridge-preview",
        options,
        Box::new(|_cc| Ok(Box::new(PreviewApp::new()))),
    )
}

struct PreviewApp {
    parser: Parser,
    capture: WaveformCapture<MAX_LEDS>,

    /// Synthetic time in milliseconds
    t_ms: u64,
    /// Wall-clock reference for delta time
    last_frame: StdInstant,
    playing: bool,
    /// Hue steps per second
    speed: f32,
    hue: f32,
    /// Number of LEDs the host sends
    led_count: usize,
    led_size: f32,
    /// Send a wrong checksum in every header
    corrupt_checksum: bool,
    /// Pause mid-frame longer than the inactivity timeout
    inject_gap: bool,

    frames_sent: u64,
}

impl PreviewApp {
    fn new() -> Self {
        Self {
            parser: AdalightParser::with_handler(StripBridge::new(&ENGINE, RefreshLength::Received))
                .with_max_pixels(MAX_LEDS),
            capture: WaveformCapture::new(),
            t_ms: 0,
            last_frame: StdInstant::now(),
            playing: true,
            speed: 60.0,
            hue: 0.0,
            led_count: DEFAULT_LED_COUNT,
            led_size: LED_SIZE,
            corrupt_checksum: false,
            inject_gap: false,
            frames_sent: 0,
        }
    }

    /// Advance synthetic time and hue by the wall-clock delta.
    fn update_time(&mut self) {
        let now = StdInstant::now();
        let delta = now.duration_since(self.last_frame);
        self.last_frame = now;

        #[allow(clippy::cast_possible_truncation)]
        let delta_ms = delta.as_millis().min(1000) as u64;
        self.t_ms = self.t_ms.wrapping_add(delta_ms);
        if self.playing {
            self.hue = (self.hue + self.speed * delta.as_secs_f32()) % 256.0;
        }
    }

    /// Build one frame the way a host program would.
    fn host_frame(&self) -> Vec<u8> {
        #[allow(clippy::cast_possible_truncation)]
        let [hi, lo] = (self.led_count as u16).to_be_bytes();
        let mut checksum = hi ^ lo ^ CHECKSUM_KEY;
        if self.corrupt_checksum {
            checksum = !checksum;
        }

        let mut bytes = Vec::with_capacity(6 + 3 * self.led_count);
        bytes.extend(ADALIGHT_MAGIC);
        bytes.extend([hi, lo, checksum]);
        for index in 0..self.led_count {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let hue = (self.hue as usize + index * 256 / self.led_count.max(1)) as u8;
            let pixel = hsv2rgb(Hsv {
                hue,
                sat: 255,
                val: 255,
            });
            bytes.extend([pixel.g, pixel.r, pixel.b]);
        }
        bytes
    }

    /// Stream one host frame through the parser and play the result.
    fn stream_frame(&mut self) {
        let bytes = self.host_frame();
        let split = if self.inject_gap { bytes.len() / 2 } else { bytes.len() };

        for &byte in &bytes[..split] {
            self.parser.on_byte(byte, Instant::from_millis(self.t_ms));
        }
        if split < bytes.len() {
            self.t_ms += INJECTED_GAP_MS;
            for &byte in &bytes[split..] {
                self.parser.on_byte(byte, Instant::from_millis(self.t_ms));
            }
        }
        self.frames_sent += 1;

        let capture = &mut self.capture;
        ENGINE.lock(|engine| pump_until_idle(engine, capture));
    }

    fn frames_shown(&self) -> u32 {
        self.parser.handler().map_or(0, StripBridge::frames)
    }
}

impl eframe::App for PreviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_time();
        if self.playing {
            self.stream_frame();
        }

        ctx.request_repaint();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                // <HostControls>
                ui.vertical(|ui| {
                    ui.horizontal(|ui| {
                        if ui
                            .button(if self.playing {
                                "⏸ Pause"
                            } else {
                                "▶ Play"
                            })
                            .clicked()
                        {
                            self.playing = !self.playing;
                        }
                        if ui.button("Step").clicked() {
                            self.stream_frame();
                        }
                    });

                    ui.add_space(4.0);

                    ui.horizontal(|ui| {
                        ui.label("Speed:");
                        ui.add(egui::Slider::new(&mut self.speed, 1.0..=512.0).logarithmic(true));
                    });

                    ui.add_space(4.0);

                    ui.horizontal(|ui| {
                        ui.label("LEDs:");
                        ui.add(egui::Slider::new(&mut self.led_count, 1usize..=MAX_LEDS));
                    });
                });
                // </HostControls>
                ui.add_space(16.0);
                // <FaultInjection>
                ui.vertical(|ui| {
                    ui.checkbox(&mut self.corrupt_checksum, "Corrupt checksum");
                    ui.checkbox(&mut self.inject_gap, "Pause mid-frame");
                    ui.horizontal(|ui| {
                        ui.label("Size: ");
                        ui.add(egui::Slider::new(&mut self.led_size, 4.0..=32.0));
                    });
                });
                // </FaultInjection>
            });

            ui.add_space(8.0);

            ui.horizontal(|ui| {
                ui.label(format!("Host frames: {}", self.frames_sent));
                ui.add_space(8.0);
                ui.label(format!("Frames shown: {}", self.frames_shown()));
                ui.add_space(8.0);
                ui.label(format!("Transfers: {}", self.capture.transfers()));
                ui.add_space(8.0);
                #[allow(clippy::cast_precision_loss)]
                let reset_us = self.capture.reset_time_ns() as f64 / 1000.0;
                ui.label(format!("Reset: {reset_us:.1} µs"));
                if self.capture.malformed() > 0 {
                    ui.add_space(8.0);
                    ui.label(format!("Malformed: {}", self.capture.malformed()));
                }
            });

            ui.add_space(16.0);

            // === LED Display ===
            let pixels: &[Rgb] = self.capture.pixels();
            let available_width = ui.available_width();
            let led_pitch = self.led_size + LED_GAP;

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let leds_per_row = (available_width / led_pitch).floor().max(1.0) as usize;
            let rows = pixels.len().div_ceil(leds_per_row);
            #[allow(clippy::cast_precision_loss)]
            let height = rows as f32 * led_pitch;

            let (response, painter) =
                ui.allocate_painter(egui::vec2(available_width, height), egui::Sense::hover());
            let origin = response.rect.min;

            #[allow(clippy::cast_precision_loss)]
            for (i, pixel) in pixels.iter().enumerate() {
                let row = i / leds_per_row;
                let col = i % leds_per_row;
                let x = origin.x + col as f32 * led_pitch;
                let y = origin.y + row as f32 * led_pitch;

                let rect = egui::Rect::from_min_size(
                    egui::pos2(x, y),
                    egui::vec2(self.led_size, self.led_size),
                );
                let color = egui::Color32::from_rgb(pixel.r, pixel.g, pixel.b);
                painter.rect_filled(rect, 3.0, color);
            }
        });
    }
}
