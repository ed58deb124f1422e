pub mod resource_canvas;
