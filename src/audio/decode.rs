use std::fs::File;
use std::path::Path;

use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error, formats::FormatOptions,
    io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

use super::{AudioBuffer, AudioFormat, DecodeError, downmix_to_mono, resample_linear};

/// Decode a file into a mono buffer at `target_rate`.
///
/// The container format is chosen by extension. WAV goes through `hound`;
/// the compressed formats go through symphonia with an extension hint.
/// Stereo (or wider) input is averaged down to mono, and anything not
/// already at `target_rate` is linearly resampled.
pub fn decode(path: &Path, target_rate: u32) -> Result<AudioBuffer, DecodeError> {
    if !path.exists() {
        return Err(DecodeError::NotFound(path.to_path_buf()));
    }
    let Some(format) = AudioFormat::from_path(path) else {
        return Err(DecodeError::UnsupportedFormat(path.to_path_buf()));
    };

    let (samples, source_rate, channels) = match format {
        AudioFormat::Wav => decode_wav(path)?,
        AudioFormat::Mp3 | AudioFormat::Flac | AudioFormat::M4a => {
            decode_compressed(path, format)?
        }
    };

    let mono = downmix_to_mono(&samples, channels);
    let samples = resample_linear(&mono, source_rate, target_rate);
    Ok(AudioBuffer {
        samples,
        sample_rate: target_rate,
    })
}

fn decode_wav(path: &Path) -> Result<(Vec<f32>, u32, u16), DecodeError> {
    let mut reader = hound::WavReader::open(path).map_err(|err| DecodeError::Malformed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    let spec = reader.spec();
    let malformed = |err: hound::Error| DecodeError::Malformed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    };

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .map_err(malformed)?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 * scale))
                .collect::<Result<Vec<f32>, _>>()
                .map_err(malformed)?
        }
    };
    Ok((samples, spec.sample_rate.max(1), spec.channels.max(1)))
}

fn decode_compressed(
    path: &Path,
    format: AudioFormat,
) -> Result<(Vec<f32>, u32, u16), DecodeError> {
    let malformed = |reason: String| DecodeError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|err| malformed(err.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(format.extension());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| malformed(format!("probe failed: {err}")))?;
    let mut reader = probed.format;
    let track = reader
        .default_track()
        .ok_or_else(|| malformed("no default track".into()))?;
    let codec_params = &track.codec_params;
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| malformed("missing sample rate".into()))?;
    let channels = codec_params
        .channels
        .ok_or_else(|| malformed("missing channel count".into()))?
        .count() as u16;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(codec_params, &DecoderOptions::default())
        .map_err(|err| malformed(format!("decoder setup failed: {err}")))?;

    let mut samples = Vec::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(_)) => break,
            Err(err) => return Err(malformed(format!("packet read failed: {err}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let audio_buf = match decoder.decode(&packet) {
            Ok(audio_buf) => audio_buf,
            Err(Error::DecodeError(_)) => continue,
            Err(err) => return Err(malformed(format!("decode failed: {err}"))),
        };
        let spec = *audio_buf.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        samples.extend_from_slice(sample_buf.samples());
    }

    if samples.is_empty() {
        return Err(malformed("decoded 0 samples".into()));
    }
    Ok((samples, sample_rate.max(1), channels.max(1)))
}
