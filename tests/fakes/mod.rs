// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Hand-written perception fakes shared by the integration tests
//!
//! The fake OCR engine tells the two sides apart by colour: front images are
//! red, back images are blue. Cropping keeps the colour.

#![allow(dead_code)]

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use cnic_extractor::pipeline::{
    BoundingBox, FaceDetector, FaceSignal, OcrEngine, OcrToken, Perception, PerceptionError,
    PipelineConfig, QrDecoder, QrPayload, RawDetection, ReconciliationEngine, RegionDetector,
};

pub const FRONT_TOKENS: [&str; 3] = ["MUHAMMAD ALI", "AHMED ALI", "3520112345671"];
pub const BACK_TOKENS: [&str; 4] = ["3520112345671", "01.01.1990", "01.01.2020", "01.01.2030"];
pub const CNIC: &str = "3520112345671";

const FRONT_COLOUR: Rgb<u8> = Rgb([200, 30, 30]);
const BACK_COLOUR: Rgb<u8> = Rgb([30, 30, 200]);

fn png(width: u32, height: u32, colour: Rgb<u8>) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, colour));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode test png");
    bytes.into_inner()
}

/// A 320x200 front photo
pub fn front_png() -> Vec<u8> {
    png(320, 200, FRONT_COLOUR)
}

/// A 320x200 back photo
pub fn back_png() -> Vec<u8> {
    png(320, 200, BACK_COLOUR)
}

fn is_front(image: &DynamicImage) -> bool {
    let pixel = image.to_rgb8().get_pixel(0, 0).0;
    pixel[0] > pixel[2]
}

fn failure(model: &'static str) -> PerceptionError {
    PerceptionError::Inference {
        model,
        reason: "simulated failure".to_string(),
    }
}

pub struct FakeRegionDetector {
    pub detections: Vec<RawDetection>,
    pub fail: bool,
}

impl RegionDetector for FakeRegionDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<RawDetection>, PerceptionError> {
        if self.fail {
            return Err(failure("fake-card-detector"));
        }
        Ok(self.detections.clone())
    }
}

pub struct FakeOcr {
    pub front: Vec<OcrToken>,
    pub back: Vec<OcrToken>,
    pub fail: bool,
    /// Dimensions of every image handed to OCR
    pub seen: Mutex<Vec<(u32, u32)>>,
}

impl OcrEngine for FakeOcr {
    fn read(&self, image: &DynamicImage) -> Result<Vec<OcrToken>, PerceptionError> {
        self.seen.lock().unwrap().push(image.dimensions());
        if self.fail {
            return Err(failure("fake-ocr"));
        }
        Ok(if is_front(image) {
            self.front.clone()
        } else {
            self.back.clone()
        })
    }
}

pub struct FakeQr {
    pub payload: Option<String>,
    /// Dimensions of every image handed to the decoder
    pub seen: Mutex<Vec<(u32, u32)>>,
}

impl QrDecoder for FakeQr {
    fn decode(&self, image: &DynamicImage) -> Result<Option<QrPayload>, PerceptionError> {
        self.seen.lock().unwrap().push(image.dimensions());
        Ok(self.payload.clone())
    }
}

pub struct FakeFace {
    pub faces: usize,
    pub fail: bool,
}

impl FaceDetector for FakeFace {
    fn detect_face(&self, _image: &DynamicImage) -> Result<FaceSignal, PerceptionError> {
        if self.fail {
            return Err(failure("fake-face"));
        }
        Ok(FaceSignal::present(self.faces))
    }
}

/// Builder for one request's worth of perception results
#[derive(Clone)]
pub struct Scenario {
    pub front: Vec<String>,
    pub back: Vec<String>,
    pub qr: Option<String>,
    pub faces: usize,
    pub detections: Vec<RawDetection>,
    pub fail_detector: bool,
    pub fail_ocr: bool,
    pub fail_face: bool,
}

impl Scenario {
    /// The canonical accepted card
    pub fn valid() -> Self {
        Self {
            front: FRONT_TOKENS.iter().map(|s| s.to_string()).collect(),
            back: BACK_TOKENS.iter().map(|s| s.to_string()).collect(),
            qr: Some(CNIC.to_string()),
            faces: 1,
            detections: Vec::new(),
            fail_detector: false,
            fail_ocr: false,
            fail_face: false,
        }
    }

    pub fn front(mut self, tokens: &[&str]) -> Self {
        self.front = tokens.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn back(mut self, tokens: &[&str]) -> Self {
        self.back = tokens.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn qr(mut self, payload: Option<&str>) -> Self {
        self.qr = payload.map(str::to_string);
        self
    }

    pub fn no_face(mut self) -> Self {
        self.faces = 0;
        self
    }

    pub fn card_at(mut self, bbox: BoundingBox, confidence: f32) -> Self {
        self.detections.push(RawDetection {
            bbox,
            confidence,
            class_id: 0,
        });
        self
    }

    pub fn failing_ocr(mut self) -> Self {
        self.fail_ocr = true;
        self
    }

    pub fn failing_face(mut self) -> Self {
        self.fail_face = true;
        self
    }

    pub fn failing_detector(mut self) -> Self {
        self.fail_detector = true;
        self
    }

    pub fn build(self) -> Harness {
        let ocr = Arc::new(FakeOcr {
            front: OcrToken::sequence(&self.front),
            back: OcrToken::sequence(&self.back),
            fail: self.fail_ocr,
            seen: Mutex::new(Vec::new()),
        });
        let qr = Arc::new(FakeQr {
            payload: self.qr,
            seen: Mutex::new(Vec::new()),
        });

        let perception = Perception {
            region_detector: Arc::new(FakeRegionDetector {
                detections: self.detections,
                fail: self.fail_detector,
            }),
            ocr: ocr.clone(),
            qr: qr.clone(),
            face: Arc::new(FakeFace {
                faces: self.faces,
                fail: self.fail_face,
            }),
        };

        Harness {
            engine: Arc::new(ReconciliationEngine::new(perception, PipelineConfig::default())),
            ocr,
            qr,
        }
    }

    pub fn engine(self) -> Arc<ReconciliationEngine> {
        self.build().engine
    }
}

/// An engine plus handles on the fakes it was built from
pub struct Harness {
    pub engine: Arc<ReconciliationEngine>,
    pub ocr: Arc<FakeOcr>,
    pub qr: Arc<FakeQr>,
}
