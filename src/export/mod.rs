pub mod filename;
pub mod frame_writer;
pub mod params;

pub use filename::{frame_filename, params_filename};
pub use frame_writer::{ExportError, ExportFormat, export_to_dir, save_frame};
pub use params::{ParameterDump, dump_parameters};
