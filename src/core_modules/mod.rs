pub mod artifacts;
pub mod control;
pub mod psnr;
pub mod thumbnail;
