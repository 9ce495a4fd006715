mod tests {
    use embassy_time::Instant;
    use strip_bridge::{IngestHandler, ParserState, Rgb, Ws2801Parser};

    #[derive(Default)]
    struct Recorder {
        pixels: Vec<(usize, Rgb)>,
        frames: Vec<usize>,
    }

    impl IngestHandler for Recorder {
        fn color_updated(&mut self, index: usize, color: Rgb) {
            self.pixels.push((index, color));
        }

        fn frame_complete(&mut self, pixel_count: usize) {
            self.frames.push(pixel_count);
        }
    }

    fn feed(parser: &mut Ws2801Parser<Recorder>, bytes: &[u8], start_ms: u64) {
        for (offset, &byte) in bytes.iter().enumerate() {
            parser.on_byte(byte, Instant::from_millis(start_ms + offset as u64));
        }
    }

    #[test]
    fn test_frame_of_two_pixels() {
        let mut parser = Ws2801Parser::with_handler(Recorder::default());
        feed(&mut parser, &[10, 20, 30, 40, 50, 60], 0);
        parser.on_frame_edge();

        let recorder = parser.handler().unwrap();
        assert_eq!(
            recorder.pixels,
            [(0, Rgb::new(20, 10, 30)), (1, Rgb::new(50, 40, 60))]
        );
        assert_eq!(recorder.frames, [2]);
        assert_eq!(parser.last_frame_len(), 2);
        assert_eq!(parser.state(), ParserState::AwaitingGreen);
    }

    #[test]
    fn test_partial_pixel_is_not_reported() {
        let mut parser = Ws2801Parser::with_handler(Recorder::default());
        feed(&mut parser, &[1, 2, 3, 4, 5], 0);
        assert_eq!(parser.state(), ParserState::AwaitingBlue);
        assert_eq!(parser.pixel_index(), 1);

        parser.on_frame_edge();
        let recorder = parser.handler().unwrap();
        assert_eq!(recorder.pixels.len(), 1);
        assert_eq!(recorder.frames, [1]);

        // The next frame starts from pixel zero and a fresh green byte
        feed(&mut parser, &[7, 8, 9], 100);
        assert_eq!(parser.handler().unwrap().pixels[1], (0, Rgb::new(8, 7, 9)));
    }

    #[test]
    fn test_gap_restarts_at_pixel_zero() {
        let mut parser = Ws2801Parser::with_handler(Recorder::default());
        feed(&mut parser, &[1, 2, 3, 4], 0);
        assert_eq!(parser.state(), ParserState::AwaitingRed);

        // 11 ms after the last byte
        parser.on_byte(0xAA, Instant::from_millis(14));
        assert_eq!(parser.pixel_index(), 0);
        assert_eq!(parser.state(), ParserState::AwaitingRed);

        parser.on_byte(0xBB, Instant::from_millis(15));
        parser.on_byte(0xCC, Instant::from_millis(16));
        let recorder = parser.handler().unwrap();
        assert_eq!(recorder.pixels.last(), Some(&(0, Rgb::new(0xBB, 0xAA, 0xCC))));
    }

    #[test]
    fn test_gap_at_timeout_is_not_expired() {
        let mut parser = Ws2801Parser::with_handler(Recorder::default());
        parser.on_byte(1, Instant::from_millis(0));
        parser.on_byte(2, Instant::from_millis(10));
        assert_eq!(parser.state(), ParserState::AwaitingBlue);
    }

    #[test]
    fn test_frame_latch_is_one_shot() {
        let mut parser = Ws2801Parser::<Recorder>::new();
        assert!(!parser.frame_complete());

        feed(&mut parser, &[1, 2, 3], 0);
        parser.on_frame_edge();
        assert!(parser.frame_complete());
        assert!(!parser.frame_complete());
    }

    #[test]
    fn test_handler_can_be_swapped() {
        let mut parser = Ws2801Parser::<Recorder>::new();
        feed(&mut parser, &[1, 2, 3], 0);
        assert!(parser.handler().is_none());

        parser.set_handler(Recorder::default());
        feed(&mut parser, &[4, 5, 6], 3);
        parser.on_frame_edge();

        let recorder = parser.take_handler().unwrap();
        assert_eq!(recorder.pixels, [(1, Rgb::new(5, 4, 6))]);
        assert_eq!(recorder.frames, [2]);
        assert!(parser.handler().is_none());
    }
}
