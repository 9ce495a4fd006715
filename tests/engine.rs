mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use strip_bridge::color::{BLACK, rgb_from_u32};
    use strip_bridge::sim::{SimulatedGenerator, WaveformCapture, pump_half, pump_until_idle};
    use strip_bridge::waveform::{
        BITS_PER_PIXEL, RESET_TIME_US, StagingHalf, decode_pixel, encode_pixel,
    };
    use strip_bridge::{RefreshError, Rgb, SharedEngine, TransmitEngine, WS2812_72MHZ, WaveformTiming};

    type Engine<const N: usize> = TransmitEngine<SimulatedGenerator, N>;

    fn engine<const N: usize>() -> Engine<N> {
        TransmitEngine::new(SimulatedGenerator::new(), WS2812_72MHZ)
    }

    #[test]
    fn test_timing_for_72mhz() {
        assert_eq!(WS2812_72MHZ.period_ticks, 90);
        assert_eq!(WS2812_72MHZ.auto_reload(), 89);
        assert_eq!(WS2812_72MHZ.one_high, 57);
        assert_eq!(WS2812_72MHZ.zero_high, 34);
        assert_eq!(WS2812_72MHZ.reset_refills, 2);
        assert_eq!(WaveformTiming::default(), WS2812_72MHZ);
    }

    #[test]
    fn test_timing_scales_with_clock() {
        let timing = WaveformTiming::for_timer_clock(64_000_000);
        assert_eq!(timing.period_ticks, 80);
        assert_eq!(timing.one_high, 51);
        assert_eq!(timing.zero_high, 30);
        assert_eq!(timing.reset_refills, 2);
    }

    #[test]
    fn test_encode_grb_msb_first() {
        let mut slots = [0u8; BITS_PER_PIXEL];
        encode_pixel(&mut slots, Rgb::new(0x80, 0x01, 0xFF), &WS2812_72MHZ);

        let (one, zero) = (WS2812_72MHZ.one_high, WS2812_72MHZ.zero_high);
        assert_eq!(slots[..8], [zero, zero, zero, zero, zero, zero, zero, one]);
        assert_eq!(slots[8..16], [one, zero, zero, zero, zero, zero, zero, zero]);
        assert_eq!(slots[16..], [one; 8]);

        assert_eq!(decode_pixel(&slots, &WS2812_72MHZ), Some(Rgb::new(0x80, 0x01, 0xFF)));
        slots[3] = 0;
        assert_eq!(decode_pixel(&slots, &WS2812_72MHZ), None);
    }

    #[test]
    fn test_pixel_access_in_range() {
        let mut engine = engine::<4>();
        let red = rgb_from_u32(0xFF0000);
        engine.set_pixel(2, red);
        assert_eq!(engine.get_pixel(2), red);
        assert_eq!(engine.get_pixel(1), BLACK);

        engine.set_pixel(4, red);
        engine.set_pixel(usize::MAX, red);
        assert_eq!(engine.get_pixel(4), BLACK);

        engine.set_all(100, red);
        for index in 0..4 {
            assert_eq!(engine.get_pixel(index), red);
        }
    }

    #[test]
    fn test_set_all_prefix() {
        let mut engine = engine::<6>();
        let blue = rgb_from_u32(0x0000FF);
        engine.set_all(3, blue);
        assert_eq!(engine.get_pixel(2), blue);
        assert_eq!(engine.get_pixel(3), BLACK);
    }

    #[test]
    fn test_refresh_stages_first_two_pixels() {
        let mut engine = engine::<8>();
        let first = Rgb::new(1, 2, 3);
        let second = Rgb::new(4, 5, 6);
        engine.set_pixel(0, first);
        engine.set_pixel(1, second);
        engine.try_refresh(5).unwrap();

        let staging = engine.staging();
        assert_eq!(decode_pixel(staging.half(StagingHalf::First), engine.timing()), Some(first));
        assert_eq!(decode_pixel(staging.half(StagingHalf::Second), engine.timing()), Some(second));
        assert_eq!(staging.as_slice().len(), 2 * BITS_PER_PIXEL);
        assert!(engine.driver().is_running());
    }

    #[test]
    fn test_refresh_swaps_and_copies_back() {
        let mut engine = engine::<4>();
        let green = rgb_from_u32(0x00FF00);
        engine.set_pixel(0, green);
        assert_eq!(engine.current_pixel(0), BLACK);

        engine.try_refresh(1).unwrap();
        assert_eq!(engine.current_pixel(0), green);
        // Next frame starts as a copy of the one being sent
        assert_eq!(engine.get_pixel(0), green);

        // Writes during the transfer do not reach the wire
        engine.set_pixel(0, BLACK);
        let mut capture = WaveformCapture::<4>::new();
        pump_until_idle(&mut engine, &mut capture);
        assert_eq!(capture.pixels(), [green]);
        assert_eq!(engine.current_pixel(0), green);
    }

    #[test]
    fn test_waveform_of_full_transfer() {
        let mut engine = engine::<8>();
        let colors = [rgb_from_u32(0x102030), rgb_from_u32(0x405060), rgb_from_u32(0x708090)];
        for (index, color) in colors.iter().enumerate() {
            engine.set_pixel(index, *color);
        }
        engine.try_refresh(3).unwrap();

        let mut capture = WaveformCapture::<8>::new();
        let halves = pump_until_idle(&mut engine, &mut capture);
        assert_eq!(halves, 3 + 2);
        assert_eq!(capture.pixels(), colors);
        assert_eq!(capture.malformed(), 0);
        assert_eq!(capture.late_pixels(), 0);
        assert_eq!(capture.reset_slots(), 2);
        assert!(capture.reset_time_ns() >= u64::from(RESET_TIME_US) * 1000);
        assert!(!engine.is_busy());
        assert_eq!(engine.driver().stops(), 1);
    }

    #[test]
    fn test_empty_refresh_sends_only_reset() {
        let mut engine = engine::<4>();
        engine.set_all(4, rgb_from_u32(0xFFFFFF));
        engine.try_refresh(0).unwrap();

        let mut capture = WaveformCapture::<4>::new();
        assert_eq!(pump_until_idle(&mut engine, &mut capture), 2);
        assert!(capture.pixels().is_empty());
        assert_eq!(capture.reset_slots(), 2);
        assert!(engine.transfer_complete());
    }

    #[test]
    fn test_led_count_is_clamped() {
        let mut engine = engine::<4>();
        engine.set_all(4, rgb_from_u32(0x010101));
        engine.try_refresh(1000).unwrap();
        assert_eq!(engine.led_count(), 4);

        let mut capture = WaveformCapture::<16>::new();
        pump_until_idle(&mut engine, &mut capture);
        assert_eq!(capture.pixels().len(), 4);
    }

    #[test]
    fn test_busy_until_reset_is_out() {
        let mut engine = engine::<4>();
        engine.try_refresh(2).unwrap();
        assert_eq!(engine.try_refresh(2), Err(RefreshError::Busy));

        let mut capture = WaveformCapture::<4>::new();
        for _ in 0..3 {
            assert!(pump_half(&mut engine, &mut capture));
            assert!(engine.is_busy());
            assert_eq!(engine.try_refresh(2), Err(RefreshError::Busy));
        }
        assert!(pump_half(&mut engine, &mut capture));
        assert!(!engine.is_busy());
        assert!(!pump_half(&mut engine, &mut capture));

        engine.try_refresh(2).unwrap();
        assert_eq!(engine.driver().starts(), 2);
    }

    #[test]
    fn test_completion_latch_is_one_shot() {
        let mut engine = engine::<4>();
        assert!(engine.transfer_complete());
        assert!(!engine.transfer_complete());

        engine.try_refresh(1).unwrap();
        assert!(!engine.transfer_complete());

        let mut capture = WaveformCapture::<4>::new();
        pump_until_idle(&mut engine, &mut capture);
        assert!(engine.transfer_complete());
        assert!(!engine.transfer_complete());
    }

    #[test]
    fn test_stale_latch_cleared_by_refresh() {
        let mut engine = engine::<4>();
        engine.try_refresh(1).unwrap();
        assert!(!engine.transfer_complete());
    }

    #[test]
    fn test_interrupts_while_idle_are_ignored() {
        let mut engine = engine::<4>();
        engine.on_half_transfer();
        engine.on_transfer_complete();
        assert_eq!(engine.driver().stops(), 0);
        assert!(engine.transfer_complete());
    }

    static COMPLETIONS: AtomicUsize = AtomicUsize::new(0);

    fn count_completion() {
        COMPLETIONS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_callback_once_per_transfer() {
        let mut engine: TransmitEngine<SimulatedGenerator, 4, fn()> =
            TransmitEngine::new(SimulatedGenerator::new(), WS2812_72MHZ);
        engine.set_transfer_complete_callback(count_completion);

        let mut capture = WaveformCapture::<4>::new();
        for round in 1..=3 {
            engine.try_refresh(round).unwrap();
            pump_until_idle(&mut engine, &mut capture);
            assert_eq!(COMPLETIONS.load(Ordering::SeqCst), round);
        }
        assert_eq!(capture.transfers(), 3);
    }

    #[test]
    fn test_blocking_refresh_waits_for_interrupts() {
        let engine: SharedEngine<SimulatedGenerator, 8> = SharedEngine::new(engine());
        let red = rgb_from_u32(0xFF0000);
        let blue = rgb_from_u32(0x0000FF);
        let done = AtomicBool::new(false);

        engine.set_all(3, red);
        engine.refresh(3);

        let capture = std::thread::scope(|scope| {
            let dma = scope.spawn(|| {
                let mut capture = WaveformCapture::<8>::new();
                while !done.load(Ordering::SeqCst) {
                    engine.lock(|engine| pump_half(engine, &mut capture));
                    std::thread::yield_now();
                }
                capture
            });

            engine.set_all(3, blue);
            engine.refresh(3);
            while engine.is_busy() {
                std::thread::yield_now();
            }
            done.store(true, Ordering::SeqCst);
            dma.join().unwrap()
        });

        assert_eq!(capture.pixels(), [blue; 3]);
        assert_eq!(capture.reset_slots(), 2);
        assert_eq!(capture.transfers(), 2);
        engine.lock(|engine| {
            assert_eq!(engine.driver().starts(), 2);
            assert_eq!(engine.driver().stops(), 2);
        });
        assert!(engine.transfer_complete());
    }
}
