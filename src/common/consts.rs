//! Compiler-wide constants: exit codes, the runtime ABI and layout widths.

/// Clean compilation, assembly written.
pub const EXIT_SUCCESS: i32 = 0;
/// Lexical, syntactic or static semantic error in the input program.
pub const EXIT_ERROR: i32 = 42;
/// Compilation succeeded but produced warnings.
pub const EXIT_WARNING: i32 = 43;
/// Internal compiler error.
pub const EXIT_EXCEPTION: i32 = 13;

/// Every value the generated code manipulates is one machine word.
pub const WORD: i32 = 4;

/// Object header: vtable pointer at offset 0, fields follow.
pub const OBJECT_HEADER: i32 = WORD;
/// Array header: vtable pointer, then length; elements follow.
pub const ARRAY_HEADER: i32 = 2 * WORD;
/// Byte offset of the length word in an array object.
pub const ARRAY_LENGTH_OFFSET: i32 = WORD;

/// External runtime symbols the emitted code links against.
pub const RT_MALLOC: &str = "__malloc";
pub const RT_EXCEPTION: &str = "__exception";
pub const RT_DEBEXIT: &str = "__debexit";
pub const RT_NATIVE_WRITE: &str = "NATIVEjava.io.OutputStream.nativeWrite";

/// Well-known canonical names resolved once at program-build time.
pub const JAVA_LANG_OBJECT: &str = "java.lang.Object";
pub const JAVA_LANG_STRING: &str = "java.lang.String";
pub const JAVA_LANG_CLONEABLE: &str = "java.lang.Cloneable";
pub const JAVA_IO_SERIALIZABLE: &str = "java.io.Serializable";

/// Name of the method the program entry point invokes on the start class.
pub const TEST_METHOD: &str = "test";
