/// MPEG-TS packet framing
pub mod ts;
