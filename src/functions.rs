//! Compiled-in table of instrumented I/O functions
//!
//! The tracing tool assigns every intercepted function a small integer id and
//! logs that id in each record. The id space is fixed at build time of the
//! tracer, so the decoder carries the same ordered table here instead of
//! trusting the advisory name list at the end of the global metadata file
//! (which logs raw-binding names like `PMPI_Barrier` that must be normalized
//! before display).
//!
//! Lookup by id returns a [`FunctionDesc`] rather than a bare string, because
//! downstream logic repeatedly needs to know which layer a call belongs to
//! and where its byte offset and transfer size live in the argument list.

use serde::Serialize;

/// Which instrumentation layer a function belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Layer {
    /// Plain POSIX I/O (read/write/open/stat family)
    Posix,
    /// MPI and MPI-IO calls
    Mpi,
    /// HDF5 library calls
    Hdf5,
}

/// Argument positions of the byte-transfer calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransferLayout {
    /// `(file id, buf, count)` - offset comes from the per-file cursor
    Plain,
    /// `(file id, buf, count, offset)` - offset is explicit
    Positioned,
    /// `(buf, size, nmemb, file id)` - count is `size * nmemb`, offset from cursor
    Buffered,
}

/// How a function interacts with byte offsets, as far as interval
/// construction cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IoClass {
    /// Moves bytes at a recoverable offset
    Transfer {
        layout: TransferLayout,
        is_read: bool,
    },
    /// Creates or opens a descriptor; resets the per-file cursor
    Open,
    /// Repositions the per-file cursor: `(file id, offset, whence)`
    Seek,
    /// Everything else (metadata calls, MPI, HDF5, ...)
    Other,
}

/// Descriptor for one instrumented function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FunctionDesc {
    /// Name as stored in the tracer's table (MPI entries carry the
    /// raw-binding `PMPI_` prefix)
    pub name: &'static str,
    pub layer: Layer,
    pub class: IoClass,
}

impl FunctionDesc {
    /// Logical name for display and aggregation: `PMPI_` is the raw MPI
    /// binding prefix and is normalized to `MPI_` by dropping the leading `P`.
    pub fn display_name(&self) -> &'static str {
        if self.name.starts_with("PMPI_") {
            &self.name[1..]
        } else {
            self.name
        }
    }
}

/// Size of the per-process function-call counter array in local metadata.
/// Larger than the table so the tracer can grow without a format bump.
pub const COUNTER_SLOTS: usize = 256;

const fn posix(name: &'static str, class: IoClass) -> FunctionDesc {
    FunctionDesc {
        name,
        layer: Layer::Posix,
        class,
    }
}

const fn mpi(name: &'static str) -> FunctionDesc {
    FunctionDesc {
        name,
        layer: Layer::Mpi,
        class: IoClass::Other,
    }
}

const fn hdf5(name: &'static str) -> FunctionDesc {
    FunctionDesc {
        name,
        layer: Layer::Hdf5,
        class: IoClass::Other,
    }
}

const READ_PLAIN: IoClass = IoClass::Transfer {
    layout: TransferLayout::Plain,
    is_read: true,
};
const WRITE_PLAIN: IoClass = IoClass::Transfer {
    layout: TransferLayout::Plain,
    is_read: false,
};
const READ_POS: IoClass = IoClass::Transfer {
    layout: TransferLayout::Positioned,
    is_read: true,
};
const WRITE_POS: IoClass = IoClass::Transfer {
    layout: TransferLayout::Positioned,
    is_read: false,
};
const READ_BUF: IoClass = IoClass::Transfer {
    layout: TransferLayout::Buffered,
    is_read: true,
};
const WRITE_BUF: IoClass = IoClass::Transfer {
    layout: TransferLayout::Buffered,
    is_read: false,
};

/// The fixed function table, indexed by the id byte in each record.
///
/// Order matches the tracer's compiled-in list exactly; ids are positional.
/// The duplicated `PMPI_Get_processor_name` entry is present in the tracer
/// and must stay to keep later ids aligned.
pub static FUNCTIONS: &[FunctionDesc] = &[
    // POSIX I/O
    posix("creat", IoClass::Open),
    posix("creat64", IoClass::Open),
    posix("open", IoClass::Open),
    posix("open64", IoClass::Open),
    posix("close", IoClass::Other),
    posix("write", WRITE_PLAIN),
    posix("read", READ_PLAIN),
    posix("lseek", IoClass::Seek),
    posix("lseek64", IoClass::Seek),
    posix("pread", READ_POS),
    posix("pread64", READ_POS),
    posix("pwrite", WRITE_POS),
    posix("pwrite64", WRITE_POS),
    posix("readv", READ_PLAIN),
    posix("writev", WRITE_PLAIN),
    posix("mmap", IoClass::Other),
    posix("mmap64", IoClass::Other),
    posix("fopen", IoClass::Open),
    posix("fopen64", IoClass::Open),
    posix("fclose", IoClass::Other),
    posix("fwrite", WRITE_BUF),
    posix("fread", READ_BUF),
    posix("ftell", IoClass::Other),
    posix("fseek", IoClass::Seek),
    posix("fsync", IoClass::Other),
    posix("fdatasync", IoClass::Other),
    posix("__xstat", IoClass::Other),
    posix("__xstat64", IoClass::Other),
    posix("__lxstat", IoClass::Other),
    posix("__lxstat64", IoClass::Other),
    posix("__fxstat", IoClass::Other),
    posix("__fxstat64", IoClass::Other),
    posix("getcwd", IoClass::Other),
    posix("mkdir", IoClass::Other),
    posix("rmdir", IoClass::Other),
    posix("chdir", IoClass::Other),
    posix("link", IoClass::Other),
    posix("linkat", IoClass::Other),
    posix("unlink", IoClass::Other),
    posix("symlink", IoClass::Other),
    posix("symlinkat", IoClass::Other),
    posix("readlink", IoClass::Other),
    posix("readlinkat", IoClass::Other),
    posix("rename", IoClass::Other),
    posix("chmod", IoClass::Other),
    posix("chown", IoClass::Other),
    posix("lchown", IoClass::Other),
    posix("utime", IoClass::Other),
    posix("opendir", IoClass::Other),
    posix("readdir", IoClass::Other),
    posix("closedir", IoClass::Other),
    posix("rewinddir", IoClass::Other),
    posix("mknod", IoClass::Other),
    posix("mknodat", IoClass::Other),
    posix("fcntl", IoClass::Other),
    posix("dup", IoClass::Other),
    posix("dup2", IoClass::Other),
    posix("pipe", IoClass::Other),
    posix("mkfifo", IoClass::Other),
    posix("umask", IoClass::Other),
    posix("fdopen", IoClass::Open),
    posix("fileno", IoClass::Other),
    posix("access", IoClass::Other),
    posix("faccessat", IoClass::Other),
    posix("tmpfile", IoClass::Other),
    posix("remove", IoClass::Other),
    // MPI and MPI-IO
    mpi("PMPI_File_close"),
    mpi("PMPI_File_set_size"),
    mpi("PMPI_File_iread_at"),
    mpi("PMPI_File_iread"),
    mpi("PMPI_File_iread_shared"),
    mpi("PMPI_File_iwrite_at"),
    mpi("PMPI_File_iwrite"),
    mpi("PMPI_File_iwrite_shared"),
    mpi("PMPI_File_open"),
    mpi("PMPI_File_read_all_begin"),
    mpi("PMPI_File_read_all"),
    mpi("PMPI_File_read_at_all"),
    mpi("PMPI_File_read_at_all_begin"),
    mpi("PMPI_File_read_at"),
    mpi("PMPI_File_read"),
    mpi("PMPI_File_read_ordered_begin"),
    mpi("PMPI_File_read_ordered"),
    mpi("PMPI_File_read_shared"),
    mpi("PMPI_File_set_view"),
    mpi("PMPI_File_sync"),
    mpi("PMPI_File_write_all_begin"),
    mpi("PMPI_File_write_all"),
    mpi("PMPI_File_write_at_all_begin"),
    mpi("PMPI_File_write_at_all"),
    mpi("PMPI_File_write_at"),
    mpi("PMPI_File_write"),
    mpi("PMPI_File_write_ordered_begin"),
    mpi("PMPI_File_write_ordered"),
    mpi("PMPI_File_write_shared"),
    mpi("PMPI_Finalize"),
    mpi("PMPI_Finalized"),
    mpi("PMPI_Init"),
    mpi("PMPI_Init_thread"),
    mpi("PMPI_Wtime"),
    mpi("PMPI_Comm_rank"),
    mpi("PMPI_Comm_size"),
    mpi("PMPI_Get_processor_name"),
    mpi("PMPI_Get_processor_name"),
    mpi("PMPI_Comm_set_errhandler"),
    mpi("PMPI_Barrier"),
    mpi("PMPI_Bcast"),
    mpi("PMPI_Gather"),
    mpi("PMPI_Gatherv"),
    mpi("PMPI_Scatter"),
    mpi("PMPI_Scatterv"),
    mpi("PMPI_Allgather"),
    mpi("PMPI_Allgatherv"),
    mpi("PMPI_Alltoall"),
    mpi("PMPI_Reduce"),
    mpi("PMPI_Allreduce"),
    mpi("PMPI_Reduce_scatter"),
    mpi("PMPI_Scan"),
    mpi("PMPI_Type_commit"),
    mpi("PMPI_Type_contiguous"),
    mpi("PMPI_Type_extent"),
    mpi("PMPI_Type_free"),
    mpi("PMPI_Type_hindexed"),
    mpi("PMPI_Op_create"),
    mpi("PMPI_Op_free"),
    mpi("PMPI_Type_get_envelope"),
    mpi("PMPI_Type_size"),
    mpi("PMPI_Cart_rank"),
    mpi("PMPI_Cart_create"),
    mpi("PMPI_Cart_get"),
    mpi("PMPI_Cart_shift"),
    mpi("PMPI_Wait"),
    mpi("PMPI_Send"),
    mpi("PMPI_Recv"),
    mpi("PMPI_Sendrecv"),
    mpi("PMPI_Isend"),
    mpi("PMPI_Irecv"),
    // HDF5
    hdf5("H5Fcreate"),
    hdf5("H5Fopen"),
    hdf5("H5Fclose"),
    hdf5("H5Fflush"),
    hdf5("H5Gclose"),
    hdf5("H5Gcreate1"),
    hdf5("H5Gcreate2"),
    hdf5("H5Gget_objinfo"),
    hdf5("H5Giterate"),
    hdf5("H5Gopen1"),
    hdf5("H5Gopen2"),
    hdf5("H5Dclose"),
    hdf5("H5Dcreate1"),
    hdf5("H5Dcreate2"),
    hdf5("H5Dget_create_plist"),
    hdf5("H5Dget_space"),
    hdf5("H5Dget_type"),
    hdf5("H5Dopen1"),
    hdf5("H5Dopen2"),
    hdf5("H5Dread"),
    hdf5("H5Dwrite"),
    hdf5("H5Dset_extent"),
    hdf5("H5Sclose"),
    hdf5("H5Screate"),
    hdf5("H5Screate_simple"),
    hdf5("H5Sget_select_npoints"),
    hdf5("H5Sget_simple_extent_dims"),
    hdf5("H5Sget_simple_extent_npoints"),
    hdf5("H5Sselect_elements"),
    hdf5("H5Sselect_hyperslab"),
    hdf5("H5Sselect_none"),
    hdf5("H5Tclose"),
    hdf5("H5Tcopy"),
    hdf5("H5Tget_class"),
    hdf5("H5Tget_size"),
    hdf5("H5Tset_size"),
    hdf5("H5Tcreate"),
    hdf5("H5Tinsert"),
    hdf5("H5Aclose"),
    hdf5("H5Acreate1"),
    hdf5("H5Acreate2"),
    hdf5("H5Aget_name"),
    hdf5("H5Aget_num_attrs"),
    hdf5("H5Aget_space"),
    hdf5("H5Aget_type"),
    hdf5("H5Aopen"),
    hdf5("H5Aopen_idx"),
    hdf5("H5Aopen_name"),
    hdf5("H5Aread"),
    hdf5("H5Awrite"),
    hdf5("H5Pclose"),
    hdf5("H5Pcreate"),
    hdf5("H5Pget_chunk"),
    hdf5("H5Pget_mdc_config"),
    hdf5("H5Pset_alignment"),
    hdf5("H5Pset_chunk"),
    hdf5("H5Pset_dxpl_mpio"),
    hdf5("H5Pset_fapl_core"),
    hdf5("H5Pset_fapl_mpio"),
    hdf5("H5Pset_fapl_mpiposix"),
    hdf5("H5Pset_istore_k"),
    hdf5("H5Pset_mdc_config"),
    hdf5("H5Pset_meta_block_size"),
    hdf5("H5Lexists"),
    hdf5("H5Lget_val"),
    hdf5("H5Literate"),
    hdf5("H5Oclose"),
    hdf5("H5Oget_info"),
    hdf5("H5Oget_info_by_name"),
    hdf5("H5Oopen"),
];

/// Look up a function descriptor by record id.
///
/// Returns `None` for ids past the end of the table (a newer tracer than
/// this decoder knows about).
pub fn lookup(id: u8) -> Option<&'static FunctionDesc> {
    FUNCTIONS.get(id as usize)
}

/// Normalized display name for a record id; `"?"` for ids the table does
/// not cover. Intended for log lines - callers that need to distinguish
/// unknown ids should use [`lookup`].
pub fn display_name(id: u8) -> &'static str {
    lookup(id).map_or("?", FunctionDesc::display_name)
}
