//! Global constants for hsitools

/// Folder inside each scene that holds the captured cubes
pub const DEFAULT_SCENE_SUBDIR: &str = "Original images";

/// Appended to the cube file stem when naming RGB renderings
pub const DEFAULT_RGB_SUFFIX: &str = "_rgb";

/// Image format of RGB renderings
pub const DEFAULT_RGB_EXTENSION: &str = "png";

/// Prefix of the sibling output root for RGB renderings (`rgb_<cmf name>`)
pub const RGB_ROOT_PREFIX: &str = "rgb_";

/// File name stem used by the crop tool (`cropped_cube_<n>.hdr`)
pub const CROP_FILE_STEM: &str = "cropped_cube";

/// Default name of the pipeline job file in the user config directory
pub const DEFAULT_CONFIG_FILENAME: &str = "hsitools-pipeline.json";
