use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use ndarray::Array3;

use crate::image_pipeline::buffer::ImageBuffer;
use crate::image_pipeline::codec::{
    ImageReader, ImageWriter, TiffCompression, TiffImageReader, TiffImageWriter, WriterConfig,
};
use crate::image_pipeline::common::error::{EnhanceError, Result};
use crate::image_pipeline::enhance::{DenoiseConfig, EnhanceConfig};
use crate::image_pipeline::pipelines::{FileEnhanceConfig, FileEnhancePipeline, MsrDcpEnhancer};

struct MockReader {
    should_fail: bool,
    mock_image: Option<ImageBuffer>,
}

impl ImageReader for MockReader {
    fn read_image(&self, _data: &[u8]) -> Result<ImageBuffer> {
        if self.should_fail {
            return Err(EnhanceError::DecodeError("Mock decode error".to_string()));
        }
        match &self.mock_image {
            Some(image) => Ok(image.clone()),
            None => gradient(16, 12),
        }
    }
}

struct MockWriter {
    should_fail: bool,
    written: Arc<Mutex<Vec<ImageBuffer>>>,
}

impl ImageWriter for MockWriter {
    fn write_image(&self, image: &ImageBuffer, _output: &mut dyn Write, _config: &WriterConfig) -> Result<()> {
        if self.should_fail {
            return Err(EnhanceError::EncodeError("Mock encode error".to_string()));
        }
        self.written.lock().unwrap().push(image.clone());
        Ok(())
    }
}

fn gradient(width: usize, height: usize) -> Result<ImageBuffer> {
    ImageBuffer::new(Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
        ((x * 13 + y * 7 + c * 40) % 256) as u8
    }))
}

fn small_config() -> EnhanceConfig {
    EnhanceConfig::builder()
        .scales(vec![2.0, 8.0, 2.0])
        .structuring_element_size(5)
        .tile_grid(2, 2)
        .build()
}

fn mock_pipeline(
    reader: MockReader,
    writer_fails: bool,
    config: FileEnhanceConfig,
) -> (FileEnhancePipeline<MockReader, MockWriter>, Arc<Mutex<Vec<ImageBuffer>>>) {
    let written = Arc::new(Mutex::new(Vec::new()));
    let writer = MockWriter {
        should_fail: writer_fails,
        written: written.clone(),
    };
    let pipeline = FileEnhancePipeline::with_custom(reader, writer, config).unwrap();
    (pipeline, written)
}

#[test]
fn test_config_builder() {
    let config = FileEnhanceConfig::builder()
        .writer(WriterConfig::builder().compression(TiffCompression::Lzw).build())
        .denoise(Some(DenoiseConfig::default()))
        .validate_dimensions(false)
        .max_dimension(Some(10000))
        .build();

    assert_eq!(config.writer.compression, TiffCompression::Lzw);
    assert!(config.denoise.is_some());
    assert!(!config.validate_dimensions);
    assert_eq!(config.max_dimension, Some(10000));
    assert_eq!(config.enhance.scales, vec![100.0, 1200.0, 100.0]);
}

#[test]
fn test_successful_conversion() {
    let reader = MockReader { should_fail: false, mock_image: None };
    let config = FileEnhanceConfig::builder().enhance(small_config()).build();
    let (pipeline, written) = mock_pipeline(reader, false, config);

    let mut output = Cursor::new(Vec::new());
    pipeline.convert(b"fake tiff data", &mut output).unwrap();

    let written = written.lock().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].shape(), (12, 16));
}

#[test]
fn test_reader_failure() {
    let reader = MockReader { should_fail: true, mock_image: None };
    let (pipeline, written) = mock_pipeline(reader, false, FileEnhanceConfig::default());

    let mut output = Cursor::new(Vec::new());
    let result = pipeline.convert(b"fake tiff data", &mut output);

    assert!(matches!(result, Err(EnhanceError::DecodeError(_))));
    assert!(written.lock().unwrap().is_empty());
}

#[test]
fn test_writer_failure() {
    let reader = MockReader { should_fail: false, mock_image: None };
    let config = FileEnhanceConfig::builder().enhance(small_config()).build();
    let (pipeline, _) = mock_pipeline(reader, true, config);

    let mut output = Cursor::new(Vec::new());
    let result = pipeline.convert(b"fake tiff data", &mut output);

    assert!(matches!(result, Err(EnhanceError::EncodeError(_))));
}

#[test]
fn test_max_dimension_rejected() {
    let reader = MockReader { should_fail: false, mock_image: None };
    let config = FileEnhanceConfig::builder()
        .enhance(small_config())
        .max_dimension(Some(10))
        .build();
    let (pipeline, written) = mock_pipeline(reader, false, config);

    let mut output = Cursor::new(Vec::new());
    let result = pipeline.convert(b"fake tiff data", &mut output);

    assert!(matches!(result, Err(EnhanceError::InvalidDimensions(16, 12))));
    assert!(written.lock().unwrap().is_empty());
}

#[test]
fn test_max_dimension_ignored_without_validation() {
    let reader = MockReader { should_fail: false, mock_image: None };
    let config = FileEnhanceConfig::builder()
        .enhance(small_config())
        .validate_dimensions(false)
        .max_dimension(Some(10))
        .build();
    let (pipeline, written) = mock_pipeline(reader, false, config);

    let mut output = Cursor::new(Vec::new());
    pipeline.convert(b"fake tiff data", &mut output).unwrap();
    assert_eq!(written.lock().unwrap().len(), 1);
}

#[test]
fn test_invalid_config_rejected_up_front() {
    let reader = MockReader { should_fail: false, mock_image: None };
    let writer = MockWriter { should_fail: false, written: Arc::default() };
    let config = FileEnhanceConfig::builder()
        .enhance(EnhanceConfig::builder().scales(Vec::new()).build())
        .build();

    let result = FileEnhancePipeline::with_custom(reader, writer, config);
    assert!(matches!(result, Err(EnhanceError::InvalidConfig(_))));

    let reader = MockReader { should_fail: false, mock_image: None };
    let writer = MockWriter { should_fail: false, written: Arc::default() };
    let config = FileEnhanceConfig::builder()
        .denoise(Some(DenoiseConfig::builder().search_window(4).build()))
        .build();

    let result = FileEnhancePipeline::with_custom(reader, writer, config);
    assert!(matches!(result, Err(EnhanceError::InvalidConfig(_))));
}

#[test]
fn test_denoise_runs_before_enhancement() {
    let image = gradient(16, 12).unwrap();
    let denoise_config = DenoiseConfig::builder().template_window(3).search_window(5).build();

    let reader = MockReader { should_fail: false, mock_image: Some(image.clone()) };
    let config = FileEnhanceConfig::builder()
        .enhance(small_config())
        .denoise(Some(denoise_config.clone()))
        .build();
    let (pipeline, written) = mock_pipeline(reader, false, config);

    let mut output = Cursor::new(Vec::new());
    pipeline.convert(b"fake tiff data", &mut output).unwrap();

    let denoised = crate::image_pipeline::enhance::denoise(&image, &denoise_config).unwrap();
    let expected = MsrDcpEnhancer::new(small_config()).unwrap().enhance(&denoised).unwrap();
    assert_eq!(written.lock().unwrap()[0], expected);
}

#[test]
fn test_enhancer_rejects_invalid_config() {
    let config = EnhanceConfig::builder().sharpen_blur_size(4).build();
    assert!(matches!(
        MsrDcpEnhancer::new(config),
        Err(EnhanceError::InvalidConfig(_))
    ));
}

#[test]
fn test_enhance_mid_gray_default_config() {
    let image = ImageBuffer::filled(64, 64, [128, 128, 128]).unwrap();
    let enhanced = MsrDcpEnhancer::default().enhance(&image).unwrap();

    assert_eq!(enhanced.shape(), (64, 64));
    assert_eq!(enhanced.pixels().dim(), (64, 64, 3));
}

#[test]
fn test_enhance_two_by_two_extremes() {
    let image = ImageBuffer::from_raw(
        2,
        2,
        vec![0, 0, 0, 255, 255, 255, 128, 128, 128, 64, 64, 64],
    )
    .unwrap();
    let enhanced = MsrDcpEnhancer::default().enhance(&image).unwrap();

    assert_eq!(enhanced.pixels().dim(), (2, 2, 3));
}

#[test]
fn test_enhance_is_deterministic() {
    let image = gradient(40, 24).unwrap();
    let enhancer = MsrDcpEnhancer::default();

    let first = enhancer.enhance(&image).unwrap();
    let second = enhancer.enhance(&image).unwrap();
    assert_eq!(first, second);

    let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
    let single = pool.install(|| enhancer.enhance(&image)).unwrap();
    assert_eq!(first, single);
}

#[test]
fn test_enhance_preserves_odd_shapes() {
    let enhancer = MsrDcpEnhancer::new(small_config()).unwrap();
    for (width, height) in [(1, 1), (1, 9), (9, 1), (17, 5)] {
        let image = gradient(width, height).unwrap();
        let enhanced = enhancer.enhance(&image).unwrap();
        assert_eq!(enhanced.shape(), (height, width));
    }
}

#[test]
fn test_extreme_parameters_stay_bounded() {
    let config = EnhanceConfig::builder()
        .scales(vec![1.0e30, f32::MAX])
        .structuring_element_size(usize::MAX / 2)
        .sharpen_blur_size(usize::MAX)
        .build();
    let enhancer = MsrDcpEnhancer::new(config).unwrap();

    let image = gradient(6, 4).unwrap();
    let enhanced = enhancer.enhance(&image).unwrap();
    assert_eq!(enhanced.shape(), (4, 6));
}

#[test]
fn test_enhance_with_timings_records_every_stage() {
    let image = gradient(16, 16).unwrap();
    let enhancer = MsrDcpEnhancer::new(small_config()).unwrap();

    let (enhanced, timings) = enhancer.enhance_with_timings(&image).unwrap();
    let names: Vec<&str> = timings.steps().iter().map(|s| s.name.as_str()).collect();

    assert_eq!(names, ["retinex", "dehaze", "clahe", "sharpen"]);
    assert_eq!(enhanced, enhancer.enhance(&image).unwrap());
}

#[test]
fn test_convert_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("input.tiff");
    let output_path = dir.path().join("output.tiff");

    let image = gradient(20, 14).unwrap();
    let mut file = std::fs::File::create(&input_path).unwrap();
    TiffImageWriter
        .write_image(&image, &mut file, &WriterConfig::default())
        .unwrap();
    drop(file);

    let config = FileEnhanceConfig::builder().enhance(small_config()).build();
    let pipeline = FileEnhancePipeline::new(config).unwrap();
    pipeline.convert_file(&input_path, &output_path).unwrap();

    let written = std::fs::read(&output_path).unwrap();
    let decoded = TiffImageReader.read_image(&written).unwrap();
    let expected = pipeline.enhancer().enhance(&image).unwrap();
    assert_eq!(decoded, expected);
}

#[test]
fn test_convert_file_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = FileEnhancePipeline::new(FileEnhanceConfig::default()).unwrap();

    let result = pipeline.convert_file(dir.path().join("absent.tiff"), dir.path().join("out.tiff"));
    assert!(matches!(result, Err(EnhanceError::InputReadError(_))));
}

#[test]
fn test_convert_file_unwritable_output() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("input.tiff");
    let mut file = std::fs::File::create(&input_path).unwrap();
    TiffImageWriter
        .write_image(&gradient(4, 4).unwrap(), &mut file, &WriterConfig::default())
        .unwrap();
    drop(file);

    let pipeline = FileEnhancePipeline::new(FileEnhanceConfig::default()).unwrap();
    let result = pipeline.convert_file(&input_path, dir.path().join("missing").join("out.tiff"));
    assert!(matches!(result, Err(EnhanceError::OutputWriteError(_))));
}
