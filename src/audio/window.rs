/// Fill `out` with the samples in `[center - out.len()/2, center - out.len()/2 + out.len())`.
///
/// Positions outside the buffer are zero. Used by both the spectral and oscilloscope paths.
pub fn read_window_into(samples: &[f32], center: usize, out: &mut [f32]) {
    let len = out.len();
    out.fill(0.0);
    if len == 0 || samples.is_empty() {
        return;
    }

    let start = center as i64 - (len / 2) as i64;
    let end = start + len as i64;

    let src_start = start.max(0);
    let src_end = end.min(samples.len() as i64);
    if src_end <= src_start {
        return;
    }

    let dst_start = (src_start - start) as usize;
    let count = (src_end - src_start) as usize;
    out[dst_start..dst_start + count]
        .copy_from_slice(&samples[src_start as usize..src_start as usize + count]);
}
