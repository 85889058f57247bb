//! Writers for minimal ROOT files, used to exercise the reader in tests.

use super::decompress::zlib_block;
use super::th1::Precision;

const BYTE_COUNT_MASK: u32 = 0x4000_0000;
const BEGIN: usize = 100;
const NBYTES_NAME: usize = 20;
const FIRST_RECORD: usize = 200;

#[derive(Debug, Clone)]
pub(crate) struct TestHist {
    name: String,
    n_bins: usize,
    x_min: f64,
    x_max: f64,
    edges: Vec<f64>,
    contents: Vec<f64>,
    sumw2: Vec<f64>,
    underflow: f64,
    overflow: f64,
}

impl TestHist {
    pub(crate) fn uniform(name: &str, n_bins: usize, x_min: f64, x_max: f64) -> Self {
        Self {
            name: name.to_string(),
            n_bins,
            x_min,
            x_max,
            edges: Vec::new(),
            contents: vec![0.0; n_bins],
            sumw2: Vec::new(),
            underflow: 0.0,
            overflow: 0.0,
        }
    }

    pub(crate) fn contents(mut self, v: &[f64]) -> Self {
        self.contents = v.to_vec();
        self
    }

    pub(crate) fn sumw2(mut self, v: &[f64]) -> Self {
        self.sumw2 = v.to_vec();
        self
    }

    pub(crate) fn edges(mut self, v: &[f64]) -> Self {
        self.edges = v.to_vec();
        self
    }

    pub(crate) fn flows(mut self, under: f64, over: f64) -> Self {
        self.underflow = under;
        self.overflow = over;
        self
    }
}

#[derive(Default)]
struct Bytes(Vec<u8>);

impl Bytes {
    fn u8(&mut self, v: u8) -> &mut Self {
        self.0.push(v);
        self
    }
    fn u16(&mut self, v: u16) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }
    fn i16(&mut self, v: i16) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }
    fn u32(&mut self, v: u32) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }
    fn i32(&mut self, v: i32) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }
    fn f32(&mut self, v: f32) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }
    fn f64(&mut self, v: f64) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }
    fn string(&mut self, s: &str) -> &mut Self {
        self.0.push(s.len() as u8);
        self.0.extend_from_slice(s.as_bytes());
        self
    }
    fn raw(&mut self, b: &[u8]) -> &mut Self {
        self.0.extend_from_slice(b);
        self
    }
    fn array_f64(&mut self, v: &[f64]) -> &mut Self {
        self.i32(v.len() as i32);
        for &x in v {
            self.f64(x);
        }
        self
    }
    fn versioned(&mut self, version: u16, body: &[u8]) -> &mut Self {
        self.u32(BYTE_COUNT_MASK | (body.len() as u32 + 2));
        self.u16(version);
        self.raw(body)
    }
}

fn tnamed(name: &str, title: &str) -> Vec<u8> {
    let mut body = Bytes::default();
    body.u16(1).u32(0).u32(0x0300_0000).string(name).string(title);
    let mut out = Bytes::default();
    out.versioned(1, &body.0);
    out.0
}

fn taxis(n_bins: usize, x_min: f64, x_max: f64, edges: &[f64]) -> Vec<u8> {
    let mut body = Bytes::default();
    body.raw(&tnamed("xaxis", ""));
    body.versioned(4, &[0u8; 18]);
    body.i32(n_bins as i32).f64(x_min).f64(x_max).array_f64(edges);
    // fFirst, fLast, fBits2, fTimeDisplay, fTimeFormat, fLabels, fModLabs
    body.i32(0).i32(0).u16(0).u8(0).string("").u32(0).u32(0);
    let mut out = Bytes::default();
    out.versioned(10, &body.0);
    out.0
}

/// Serialize a `TH1D`/`TH1F` object the way ROOT's streamer lays it out.
pub(crate) fn th1_payload(h: &TestHist, precision: Precision) -> Vec<u8> {
    let n_cells = h.n_bins + 2;
    let mut cells = vec![h.underflow];
    cells.extend_from_slice(&h.contents);
    cells.push(h.overflow);
    let sumw2: Vec<f64> = if h.sumw2.is_empty() {
        Vec::new()
    } else {
        let mut v = vec![0.0];
        v.extend_from_slice(&h.sumw2);
        v.push(0.0);
        v
    };

    let mut th1 = Bytes::default();
    th1.raw(&tnamed(&h.name, "test histogram"));
    th1.versioned(2, &[0u8; 6]);
    th1.versioned(2, &[0u8; 4]);
    th1.versioned(2, &[0u8; 8]);
    th1.i32(n_cells as i32);
    th1.raw(&taxis(h.n_bins, h.x_min, h.x_max, &h.edges));
    th1.raw(&taxis(1, 0.0, 1.0, &[]));
    th1.raw(&taxis(1, 0.0, 1.0, &[]));
    th1.i16(1000).i16(0);
    for _ in 0..5 {
        th1.f64(0.0);
    }
    th1.f64(-1111.0).f64(-1111.0).f64(0.0);
    th1.array_f64(&[]);
    th1.array_f64(&sumw2);
    th1.string("");
    th1.versioned(5, &[0u8; 12]);
    th1.i32(0).i32(0).i32(1);

    let mut body = Bytes::default();
    body.versioned(8, &th1.0);
    match precision {
        Precision::Double => {
            body.array_f64(&cells);
        }
        Precision::Float => {
            body.i32(cells.len() as i32);
            for &c in &cells {
                body.f32(c as f32);
            }
        }
    }

    let mut out = Bytes::default();
    out.versioned(3, &body.0);
    out.0
}

/// Key record already placed in the file.
#[derive(Debug, Clone)]
pub(crate) struct KeyRec {
    class: String,
    name: String,
    n_bytes: u32,
    obj_len: u32,
    cycle: u16,
    seek: u32,
}

fn key_header(rec: &KeyRec) -> Vec<u8> {
    let key_len = 26 + 3 + rec.class.len() + rec.name.len();
    let mut b = Bytes::default();
    b.u32(rec.n_bytes)
        .u16(4)
        .u32(rec.obj_len)
        .u32(0)
        .u16(key_len as u16)
        .u16(rec.cycle)
        .u32(rec.seek)
        .u32(BEGIN as u32)
        .string(&rec.class)
        .string(&rec.name)
        .string("");
    b.0
}

/// Appends records to an in-memory ROOT file.
pub(crate) struct FileBuilder {
    buf: Vec<u8>,
}

impl FileBuilder {
    pub(crate) fn new() -> Self {
        Self {
            buf: vec![0u8; FIRST_RECORD],
        }
    }

    pub(crate) fn object(
        &mut self,
        class: &str,
        name: &str,
        cycle: u16,
        payload: &[u8],
        compress: bool,
    ) -> KeyRec {
        let stored = if compress { zlib_block(payload) } else { payload.to_vec() };
        let mut rec = KeyRec {
            class: class.to_string(),
            name: name.to_string(),
            n_bytes: 0,
            obj_len: payload.len() as u32,
            cycle,
            seek: self.buf.len() as u32,
        };
        let key_len = key_header(&rec).len();
        rec.n_bytes = (key_len + stored.len()) as u32;
        let header = key_header(&rec);
        self.buf.extend_from_slice(&header);
        self.buf.extend_from_slice(&stored);
        rec
    }

    pub(crate) fn histogram(&mut self, hist: &TestHist, compress: bool) -> KeyRec {
        let payload = th1_payload(hist, Precision::Double);
        self.object("TH1D", &hist.name, 1, &payload, compress)
    }

    pub(crate) fn directory(&mut self, name: &str, keys: &[KeyRec]) -> KeyRec {
        let seek_keys = self.key_list(keys);
        let mut streamer = Bytes::default();
        streamer
            .u16(5)
            .u32(0)
            .u32(0)
            .u32(0)
            .u32(0)
            .u32(0)
            .u32(BEGIN as u32)
            .u32(seek_keys as u32);
        self.object("TDirectoryFile", name, 1, &streamer.0, false)
    }

    fn key_list(&mut self, keys: &[KeyRec]) -> usize {
        let pos = self.buf.len();
        let list_key = KeyRec {
            class: "TFile".to_string(),
            name: "test.root".to_string(),
            n_bytes: 0,
            obj_len: 0,
            cycle: 1,
            seek: pos as u32,
        };
        self.buf.extend_from_slice(&key_header(&list_key));
        self.buf.extend_from_slice(&(keys.len() as u32).to_be_bytes());
        for k in keys {
            self.buf.extend_from_slice(&key_header(k));
        }
        pos
    }

    pub(crate) fn finish(mut self, top_keys: &[KeyRec]) -> Vec<u8> {
        let seek_keys = self.key_list(top_keys);
        let end = self.buf.len() as u32;

        let mut header = Bytes::default();
        header
            .raw(b"root")
            .u32(62206)
            .u32(BEGIN as u32)
            .u32(end)
            .u32(0)
            .u32(0)
            .u32(0)
            .u32(NBYTES_NAME as u32)
            .u8(4)
            .u32(0)
            .u32(0)
            .u32(0)
            .raw(&[0u8; 18]);
        self.buf[..header.0.len()].copy_from_slice(&header.0);

        let mut dir = Bytes::default();
        dir.u16(5)
            .u32(0)
            .u32(0)
            .u32(0)
            .u32(NBYTES_NAME as u32)
            .u32(BEGIN as u32)
            .u32(0)
            .u32(seek_keys as u32);
        let at = BEGIN + NBYTES_NAME;
        self.buf[at..at + dir.0.len()].copy_from_slice(&dir.0);
        self.buf
    }
}

/// One-histogram file, the common case in tests.
pub(crate) fn single_histogram_file(hist: &TestHist, compress: bool) -> Vec<u8> {
    let mut b = FileBuilder::new();
    let key = b.histogram(hist, compress);
    b.finish(&[key])
}
