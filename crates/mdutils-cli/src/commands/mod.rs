pub mod align_on_col;
pub mod data_edit;
pub mod dump_edit;
pub mod pdb_edit;
pub mod psf_edit;
