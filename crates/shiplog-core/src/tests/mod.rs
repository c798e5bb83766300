mod editor;
mod import;
