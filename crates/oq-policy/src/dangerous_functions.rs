/// Fixed deny list of dangerous function names (spec §4.3 rule 6):
/// sleep, backend termination, large-object I/O, file I/O, cross-database
/// dblink, statistics/file introspection.
pub const DANGEROUS_FUNCTIONS: &[&str] = &[
    "pg_sleep",
    "pg_sleep_for",
    "pg_sleep_until",
    "pg_terminate_backend",
    "pg_cancel_backend",
    "lo_import",
    "lo_export",
    "lo_read",
    "lo_write",
    "lo_creat",
    "lo_create",
    "pg_read_file",
    "pg_read_binary_file",
    "pg_write_file",
    "pg_ls_dir",
    "pg_stat_file",
    "dblink",
    "dblink_connect",
    "dblink_exec",
    "copy_from_program",
    "copy_to_program",
];

pub fn is_dangerous(name: &str) -> bool {
    DANGEROUS_FUNCTIONS.contains(&name)
}
