use siga_lib::modules::import_jobs::{ImportStats, UploadFile};

pub fn padron_file() -> UploadFile {
    UploadFile::new("padron.xlsx", b"DNI;Nombre\n30111222;Socia Uno\n".to_vec())
}

pub fn padron_stats() -> ImportStats {
    ImportStats {
        total_rows: 500,
        imported: 480,
        updated: 20,
        errors: 0,
    }
}
